//! In-memory store implementation.
//!
//! Backs both store traits with `RwLock`-guarded maps. Concurrent updates to
//! the same connection record serialize on the write lock, matching the
//! serialization the framework's storage layer provides.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use herald_core::ids::{ConnectionId, RecipientKey};

use crate::errors::{Result, StoreError};
use crate::records::{ConnectionRecord, MediationRecord};
use crate::traits::{ConnectionStore, MediationStore};

/// In-memory connection and mediation store.
#[derive(Default)]
pub struct MemoryStore {
    connections: RwLock<HashMap<ConnectionId, ConnectionRecord>>,
    mediations: RwLock<HashMap<RecipientKey, MediationRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a connection record.
    pub async fn insert_connection(&self, record: ConnectionRecord) {
        let mut connections = self.connections.write().await;
        let _ = connections.insert(record.id.clone(), record);
    }

    /// Insert (or replace) a mediation record.
    pub async fn insert_mediation(&self, record: MediationRecord) {
        let mut mediations = self.mediations.write().await;
        let _ = mediations.insert(record.recipient_key.clone(), record);
    }

    /// Number of stored connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn find_by_id(&self, id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
        let connections = self.connections.read().await;
        Ok(connections.get(id).cloned())
    }

    async fn update(&self, record: &ConnectionRecord) -> Result<()> {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::connection_not_found(record.id.as_str())),
        }
    }
}

#[async_trait]
impl MediationStore for MemoryStore {
    async fn find_single_by_recipient_key(
        &self,
        recipient_key: &RecipientKey,
    ) -> Result<MediationRecord> {
        let mediations = self.mediations.read().await;
        mediations
            .get(recipient_key)
            .cloned()
            .ok_or_else(|| StoreError::mediation_not_found(recipient_key.as_str()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
