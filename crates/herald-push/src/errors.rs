//! Push transport error types.

use thiserror::Error;

/// Errors raised while loading the push credential at startup.
///
/// All of these are fatal: the process must not start event processing
/// without a usable credential.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The credential environment variable is not set.
    #[error("{name} environment variable is not set; add the service-account configuration")]
    MissingEnv {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// The credential blob is not valid base64.
    #[error("failed to decode service-account blob: {reason}")]
    Decode {
        /// Error description.
        reason: String,
    },
    /// The decoded credential is not a valid service-account JSON document.
    #[error("failed to parse service-account JSON: {reason}")]
    Parse {
        /// Error description.
        reason: String,
    },
    /// A required service-account field is empty.
    #[error("service account is missing required field {field}")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },
}

/// Errors raised by the push gateway.
#[derive(Debug, Error)]
pub enum PushError {
    /// Credential loading failed (see [`ConfigError`]).
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Failed to parse the service-account private key.
    #[error("failed to parse service-account private key: {reason}")]
    KeyParse {
        /// Error description.
        reason: String,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild {
        /// Error description.
        reason: String,
    },
    /// Failed to sign the OAuth assertion JWT.
    #[error("failed to sign JWT: {reason}")]
    JwtSign {
        /// Error description.
        reason: String,
    },
    /// The token endpoint rejected the bearer grant.
    #[error("token endpoint returned {status}: {message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
    /// Transport-level HTTP failure.
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The delivery service rejected the message.
    #[error("push delivery rejected with status {status}{}", .reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// FCM error status (e.g. `UNREGISTERED`), when present in the body.
        reason: Option<String>,
    },
    /// The gateway is shutting down and refuses new sends.
    #[error("push gateway is shutting down")]
    ShuttingDown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_display_names_variable() {
        let err = ConfigError::MissingEnv {
            name: "SERVICE_ACCOUNT",
        };
        assert!(err.to_string().contains("SERVICE_ACCOUNT"));
    }

    #[test]
    fn rejected_display_with_reason() {
        let err = PushError::Rejected {
            status: 404,
            reason: Some("UNREGISTERED".into()),
        };
        assert_eq!(
            err.to_string(),
            "push delivery rejected with status 404 (UNREGISTERED)"
        );
    }

    #[test]
    fn rejected_display_without_reason() {
        let err = PushError::Rejected {
            status: 500,
            reason: None,
        };
        assert_eq!(err.to_string(), "push delivery rejected with status 500");
    }

    #[test]
    fn config_error_converts_into_push_error() {
        let err: PushError = ConfigError::MissingEnv {
            name: "SERVICE_ACCOUNT",
        }
        .into();
        assert!(matches!(err, PushError::Config(_)));
    }
}
