//! Store error types.

use thiserror::Error;

/// Errors surfaced by the record-store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given key.
    #[error("no {entity} record found for {key}")]
    NotFound {
        /// Entity kind ("connection", "mediation").
        entity: &'static str,
        /// The key that missed.
        key: String,
    },
    /// The underlying store failed.
    #[error("store backend error: {reason}")]
    Backend {
        /// Error description from the backing store.
        reason: String,
    },
}

impl StoreError {
    /// Construct a `NotFound` for a mediation record.
    #[must_use]
    pub fn mediation_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "mediation",
            key: key.into(),
        }
    }

    /// Construct a `NotFound` for a connection record.
    #[must_use]
    pub fn connection_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "connection",
            key: key.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
