//! Processed DIDComm messages and the three recognized message types.
//!
//! The agent framework hands every processed message to subscribers as an
//! opaque `{type, body}` pair. Only three type URIs are acted on here; the
//! typed body payloads in this module are the narrow waist between the
//! framework's untyped JSON and the dispatcher's logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{MessageId, RecipientKey};
use crate::registration::DevicePlatform;

/// Routing forward message — a message is being relayed to a mediated
/// connection, which may be offline.
pub const FORWARD_MESSAGE_TYPE: &str = "https://didcomm.org/routing/1.0/forward";

/// FCM device-info registration message.
pub const FCM_SET_DEVICE_INFO_TYPE: &str =
    "https://didcomm.org/push-notifications-fcm/1.0/set-device-info";

/// APNs device-info registration message.
pub const APNS_SET_DEVICE_INFO_TYPE: &str =
    "https://didcomm.org/push-notifications-apns/1.0/set-device-info";

/// Message type URIs the notification observer reacts to.
const RECOGNIZED_TYPES: &[&str] = &[
    FORWARD_MESSAGE_TYPE,
    FCM_SET_DEVICE_INFO_TYPE,
    APNS_SET_DEVICE_INFO_TYPE,
];

/// Whether a message type URI is one the observer acts on.
#[must_use]
pub fn is_recognized_type(type_uri: &str) -> bool {
    RECOGNIZED_TYPES.contains(&type_uri)
}

/// A message the framework has finished processing.
///
/// `message_type` is the DIDComm piuri; `body` is the message body as
/// emitted by the framework. Bodies of recognized types are deserialized
/// into the typed payload structs below at the dispatch boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    /// Message ID assigned by the sender.
    pub id: MessageId,
    /// DIDComm message type URI.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Message body, shape determined by `message_type`.
    pub body: Value,
}

impl ProcessedMessage {
    /// Create a message with a fresh ID.
    #[must_use]
    pub fn new(message_type: impl Into<String>, body: Value) -> Self {
        Self {
            id: MessageId::new(),
            message_type: message_type.into(),
            body,
        }
    }

    /// Build a routing forward message for `to`.
    #[must_use]
    pub fn forward(to: &RecipientKey) -> Self {
        Self::new(
            FORWARD_MESSAGE_TYPE,
            serde_json::json!({ "to": to.as_str() }),
        )
    }

    /// Build an FCM set-device-info message.
    ///
    /// `token: None` (or empty) and `platform: None` model explicit
    /// unregistration, matching the wire format's nullable fields.
    #[must_use]
    pub fn fcm_device_info(token: Option<&str>, platform: Option<DevicePlatform>) -> Self {
        Self::new(
            FCM_SET_DEVICE_INFO_TYPE,
            serde_json::json!({
                "device_token": token,
                "device_platform": platform,
            }),
        )
    }

    /// Build an APNs set-device-info message.
    #[must_use]
    pub fn apns_device_info(token: Option<&str>) -> Self {
        Self::new(
            APNS_SET_DEVICE_INFO_TYPE,
            serde_json::json!({ "device_token": token }),
        )
    }
}

/// Body of a routing forward message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardPayload {
    /// Recipient key the forwarded message is addressed to.
    pub to: RecipientKey,
}

/// Body of an FCM set-device-info message.
///
/// Both fields are nullable on the wire; a missing or empty token means
/// the sender is unregistering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcmDeviceInfoPayload {
    /// Device token, absent/empty on unregistration.
    #[serde(default)]
    pub device_token: Option<String>,
    /// Platform the token belongs to.
    #[serde(default)]
    pub device_platform: Option<DevicePlatform>,
}

impl FcmDeviceInfoPayload {
    /// The device token, normalized: `None` when absent or empty.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.device_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Body of an APNs set-device-info message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnsDeviceInfoPayload {
    /// Device token, absent/empty on unregistration.
    #[serde(default)]
    pub device_token: Option<String>,
}

impl ApnsDeviceInfoPayload {
    /// The device token, normalized: `None` when absent or empty.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.device_token.as_deref().filter(|t| !t.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognized_types_positive() {
        assert!(is_recognized_type(FORWARD_MESSAGE_TYPE));
        assert!(is_recognized_type(FCM_SET_DEVICE_INFO_TYPE));
        assert!(is_recognized_type(APNS_SET_DEVICE_INFO_TYPE));
    }

    #[test]
    fn recognized_types_negative() {
        assert!(!is_recognized_type("https://didcomm.org/trust-ping/1.0/ping"));
        assert!(!is_recognized_type(""));
    }

    #[test]
    fn forward_builder_shape() {
        let msg = ProcessedMessage::forward(&RecipientKey::from("verkey-1"));
        assert_eq!(msg.message_type, FORWARD_MESSAGE_TYPE);
        assert_eq!(msg.body, json!({"to": "verkey-1"}));
        let payload: ForwardPayload = serde_json::from_value(msg.body).unwrap();
        assert_eq!(payload.to.as_str(), "verkey-1");
    }

    #[test]
    fn fcm_payload_parses_snake_case_body() {
        let payload: FcmDeviceInfoPayload = serde_json::from_value(json!({
            "device_token": "tok-1",
            "device_platform": "android",
        }))
        .unwrap();
        assert_eq!(payload.token(), Some("tok-1"));
        assert_eq!(payload.device_platform, Some(DevicePlatform::Android));
    }

    #[test]
    fn fcm_payload_null_fields() {
        let payload: FcmDeviceInfoPayload =
            serde_json::from_value(json!({"device_token": null, "device_platform": null}))
                .unwrap();
        assert_eq!(payload.token(), None);
        assert_eq!(payload.device_platform, None);
    }

    #[test]
    fn empty_token_normalizes_to_none() {
        let payload: ApnsDeviceInfoPayload =
            serde_json::from_value(json!({"device_token": ""})).unwrap();
        assert_eq!(payload.token(), None);
    }

    #[test]
    fn apns_builder_round_trips() {
        let msg = ProcessedMessage::apns_device_info(Some("tok-9"));
        let payload: ApnsDeviceInfoPayload = serde_json::from_value(msg.body).unwrap();
        assert_eq!(payload.token(), Some("tok-9"));
    }

    #[test]
    fn processed_message_serde_uses_type_field() {
        let msg = ProcessedMessage::forward(&RecipientKey::from("k"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], FORWARD_MESSAGE_TYPE);
        assert!(value["id"].is_string());
    }

    #[test]
    fn forward_payload_missing_to_is_an_error() {
        let result = serde_json::from_value::<ForwardPayload>(json!({}));
        assert!(result.is_err());
    }
}
