//! Branded ID newtypes for type safety.
//!
//! Every entity crossing the framework boundary has a distinct ID type
//! implemented as a newtype wrapper around `String`. This prevents
//! accidentally passing a recipient key where a connection ID is expected.
//!
//! Generated values are UUID v7 (time-ordered) via [`uuid::Uuid::now_v7`];
//! values arriving from the framework are wrapped as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of a connection record owned by the agent framework.
    ConnectionId
}

branded_id! {
    /// Recipient key a mediation record is keyed by (a verkey on the wire).
    RecipientKey
}

branded_id! {
    /// Identifier of a DIDComm message.
    MessageId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn from_str_round_trips() {
        let id = ConnectionId::from("conn-1");
        assert_eq!(id.as_str(), "conn-1");
        assert_eq!(String::from(id), "conn-1");
    }

    #[test]
    fn display_matches_inner() {
        let key = RecipientKey::from("8HH5gYEeNc3z7PYXmd54d4");
        assert_eq!(key.to_string(), "8HH5gYEeNc3z7PYXmd54d4");
    }

    #[test]
    fn serde_is_transparent() {
        let id = MessageId::from("msg-1");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!("msg-1"));
        let back: MessageId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn distinct_types_do_not_compare() {
        // Compile-time property: ConnectionId and RecipientKey are distinct
        // types even with equal inner strings.
        let conn = ConnectionId::from("x");
        let key = RecipientKey::from("x");
        assert_eq!(conn.as_str(), key.as_str());
    }
}
