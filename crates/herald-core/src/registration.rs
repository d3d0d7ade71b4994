//! Device registration metadata stored on a connection record.
//!
//! A connection that wants push delivery stores exactly one
//! [`DeviceRegistration`] under [`PUSH_NOTIFICATION_METADATA_KEY`] in its
//! metadata mapping. Absence of the key means no registration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection-metadata key under which the device registration is stored.
///
/// Wire/storage format of the value: `{"deviceToken": "...",
/// "devicePlatform": "ios" | "android"}`.
pub const PUSH_NOTIFICATION_METADATA_KEY: &str = "pushNotificationMetadata";

/// Platform a device token was issued for.
///
/// Selects delivery-channel-specific formatting in the push gateway
/// (e.g. the iOS sound directive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    /// Apple device; delivery goes out with APNs-specific payload fields.
    Ios,
    /// Android device.
    Android,
}

impl DevicePlatform {
    /// The wire/storage string for this platform.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for DevicePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection's registered push target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    /// Opaque device token issued by the platform's push service.
    pub device_token: String,
    /// Platform the token belongs to.
    pub device_platform: DevicePlatform,
}

impl DeviceRegistration {
    /// Create a registration from a token and platform.
    #[must_use]
    pub fn new(device_token: impl Into<String>, device_platform: DevicePlatform) -> Self {
        Self {
            device_token: device_token.into(),
            device_platform,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
