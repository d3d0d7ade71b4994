//! Typed views of the framework's connection and mediation records.
//!
//! A connection's metadata mapping is `string key → arbitrary JSON`; the
//! device-registration accessors below are the only place that mapping is
//! read or written, so untyped JSON never reaches dispatcher logic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use herald_core::ids::{ConnectionId, RecipientKey};
use herald_core::registration::{DeviceRegistration, PUSH_NOTIFICATION_METADATA_KEY};

/// A connection owned by the agent framework.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Connection ID.
    pub id: ConnectionId,
    /// Display label the remote party announced, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub their_label: Option<String>,
    /// Whether the connection protocol has completed.
    pub is_ready: bool,
    /// Mutable metadata mapping. Only the device-registration key is touched
    /// here; other keys belong to other framework consumers and pass through
    /// untouched.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ConnectionRecord {
    /// Create a ready connection with no label or metadata.
    #[must_use]
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            their_label: None,
            is_ready: true,
            metadata: Map::new(),
        }
    }

    /// Set the remote party's display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.their_label = Some(label.into());
        self
    }

    /// Set the readiness flag.
    #[must_use]
    pub fn with_ready(mut self, is_ready: bool) -> Self {
        self.is_ready = is_ready;
        self
    }

    /// Read the device registration from metadata.
    ///
    /// Returns `None` when the key is absent. A present-but-malformed value
    /// is logged and treated as absent rather than failing message handling.
    #[must_use]
    pub fn device_registration(&self) -> Option<DeviceRegistration> {
        let value = self.metadata.get(PUSH_NOTIFICATION_METADATA_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(registration) => Some(registration),
            Err(e) => {
                warn!(
                    connection_id = %self.id,
                    error = %e,
                    "malformed device registration in connection metadata"
                );
                None
            }
        }
    }

    /// Write (or overwrite) the device registration. No merge: any prior
    /// token and platform are replaced.
    pub fn set_device_registration(&mut self, registration: &DeviceRegistration) {
        let value = match serde_json::to_value(registration) {
            Ok(v) => v,
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "failed to serialize device registration");
                return;
            }
        };
        let _ = self
            .metadata
            .insert(PUSH_NOTIFICATION_METADATA_KEY.to_string(), value);
    }

    /// Delete the device registration. Idempotent; returns whether a
    /// registration was present.
    pub fn clear_device_registration(&mut self) -> bool {
        self.metadata.remove(PUSH_NOTIFICATION_METADATA_KEY).is_some()
    }
}

/// A mediation record pairing a recipient key with the connection
/// responsible for forwarding. Read-only from herald's perspective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediationRecord {
    /// Recipient key the record is keyed by.
    pub recipient_key: RecipientKey,
    /// Connection that forwards for this recipient.
    pub connection_id: ConnectionId,
    /// Whether mediation has been granted.
    pub is_ready: bool,
}

impl MediationRecord {
    /// Create a ready mediation record.
    #[must_use]
    pub fn new(recipient_key: RecipientKey, connection_id: ConnectionId) -> Self {
        Self {
            recipient_key,
            connection_id,
            is_ready: true,
        }
    }

    /// Set the readiness flag.
    #[must_use]
    pub fn with_ready(mut self, is_ready: bool) -> Self {
        self.is_ready = is_ready;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
