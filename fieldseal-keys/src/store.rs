//! Persistence interface for DEK records.
//!
//! The store owns record identity, timestamps and etags. The DEK provider
//! only calls create/read/replace.

use crate::error::{KeyError, KeyResult};
use crate::types::DataEncryptionKeyRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Durable storage for wrapped data encryption keys.
#[async_trait]
pub trait DataEncryptionKeyStore: Send + Sync {
    /// Persists a new record and returns it with store-assigned fields.
    ///
    /// Fails with [`KeyError::DekAlreadyExists`] if the id is taken.
    async fn create(&self, record: DataEncryptionKeyRecord) -> KeyResult<DataEncryptionKeyRecord>;

    /// Reads a record. Fails with [`KeyError::DekNotFound`] if absent.
    async fn read(&self, id: &str) -> KeyResult<DataEncryptionKeyRecord>;

    /// Replaces a record if its current etag equals `if_match`.
    ///
    /// Fails with [`KeyError::PreconditionFailed`] on an etag mismatch.
    async fn replace(
        &self,
        record: DataEncryptionKeyRecord,
        if_match: &str,
    ) -> KeyResult<DataEncryptionKeyRecord>;
}

/// Process-local store for tests and single-instance deployments.
#[derive(Clone, Default)]
pub struct InMemoryDekStore {
    records: Arc<RwLock<HashMap<String, DataEncryptionKeyRecord>>>,
}

impl InMemoryDekStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DataEncryptionKeyStore for InMemoryDekStore {
    async fn create(
        &self,
        mut record: DataEncryptionKeyRecord,
    ) -> KeyResult<DataEncryptionKeyRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(KeyError::DekAlreadyExists(record.id));
        }

        let now = Utc::now();
        record.rid = Uuid::new_v4().simple().to_string();
        record.etag = Uuid::new_v4().to_string();
        record.created_at = now;
        record.last_modified = now;
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn read(&self, id: &str) -> KeyResult<DataEncryptionKeyRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| KeyError::DekNotFound(id.to_string()))
    }

    async fn replace(
        &self,
        mut record: DataEncryptionKeyRecord,
        if_match: &str,
    ) -> KeyResult<DataEncryptionKeyRecord> {
        let mut records = self.records.write().await;
        let current = records
            .get(&record.id)
            .ok_or_else(|| KeyError::DekNotFound(record.id.clone()))?;
        if current.etag != if_match {
            return Err(KeyError::PreconditionFailed(record.id));
        }

        record.rid = current.rid.clone();
        record.created_at = current.created_at;
        record.last_modified = Utc::now();
        record.etag = Uuid::new_v4().to_string();
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}
