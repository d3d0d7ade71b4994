//! Dispatcher error types.

use thiserror::Error;

use herald_store::StoreError;

/// Errors surfaced by [`crate::NotificationObserver::handle`].
///
/// Delivery failures never appear here: the forward branch catches and logs
/// them so best-effort push delivery cannot disrupt message processing.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A record store operation failed. Includes the missing-mediation case,
    /// which deliberately propagates out of the forward branch.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A recognized message carried a body that does not match its type.
    #[error("malformed {message_type} body: {reason}")]
    Payload {
        /// Message type URI of the offending message.
        message_type: String,
        /// Deserialization error description.
        reason: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
