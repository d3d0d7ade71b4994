//! Async store traits over the framework's record repositories.
//!
//! Real deployments implement these against the framework's storage; tests
//! and embedders without a framework use [`crate::MemoryStore`].

use async_trait::async_trait;

use herald_core::ids::{ConnectionId, RecipientKey};

use crate::errors::Result;
use crate::records::{ConnectionRecord, MediationRecord};

/// Read/write access to connection records.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Look up a connection by ID. `Ok(None)` when absent.
    async fn find_by_id(&self, id: &ConnectionId) -> Result<Option<ConnectionRecord>>;

    /// Persist a mutated connection record.
    async fn update(&self, record: &ConnectionRecord) -> Result<()>;
}

/// Read access to mediation records.
#[async_trait]
pub trait MediationStore: Send + Sync {
    /// Look up the single mediation record keyed by `recipient_key`.
    ///
    /// Errors with [`crate::StoreError::NotFound`] when no record exists —
    /// a missing record for an in-flight forward implies a deeper
    /// inconsistency and is not softened to an `Option`.
    async fn find_single_by_recipient_key(
        &self,
        recipient_key: &RecipientKey,
    ) -> Result<MediationRecord>;
}
