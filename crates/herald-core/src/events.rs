//! Message-processed events and their broadcast emitter.
//!
//! The agent framework integration emits one [`MessageProcessedEvent`] per
//! processed inbound message. [`EventEmitter`] is the concrete broadcast
//! channel behind that subscription; observers hold a
//! [`tokio::sync::broadcast::Receiver`] and never block the emitter.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::ConnectionId;
use crate::messages::ProcessedMessage;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Event emitted after the framework has processed an inbound message.
///
/// `connection_id` identifies the connection the message arrived over, when
/// the framework could establish one; device-info messages without it are
/// dropped by the dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageProcessedEvent {
    /// The processed message.
    pub message: ProcessedMessage,
    /// Connection the message arrived over, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
}

impl MessageProcessedEvent {
    /// Create an event without connection context.
    #[must_use]
    pub fn new(message: ProcessedMessage) -> Self {
        Self {
            message,
            connection_id: None,
        }
    }

    /// Create an event with connection context.
    #[must_use]
    pub fn with_connection(message: ProcessedMessage, connection_id: ConnectionId) -> Self {
        Self {
            message,
            connection_id: Some(connection_id),
        }
    }
}

/// Broadcast-based event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers will be dropped
/// (lagged) rather than blocking the sender.
pub struct EventEmitter {
    tx: broadcast::Sender<MessageProcessedEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Create a new emitter with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new emitter with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Emit an event to all subscribers. Non-blocking.
    ///
    /// Returns the number of receivers that received the event.
    /// Returns 0 if there are no active subscribers.
    pub fn emit(&self, event: MessageProcessedEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that will receive
    /// all events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageProcessedEvent> {
        self.tx.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the total number of events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
