//! Migration bookkeeping
//!
//! One row per migrated resource key. A successful migration inserts the
//! row, or reactivates and restamps a retired one. Retiring is logical;
//! only `purge` removes a row.

use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use mig_types::{MigrationRecord, ResourceKey, ResourceKind};

/// Storage for [`MigrationRecord`]s
#[async_trait]
pub trait MigrationRecordStore: Send + Sync {
    /// Insert or reactivate the record for `uuid`
    async fn record_migrated(&self, uuid: &ResourceKey, kind: ResourceKind) -> Result<MigrationRecord>;

    /// Mark a record inactive; `false` if there was none
    async fn retire(&self, uuid: &ResourceKey) -> Result<bool>;

    /// Remove a record; `false` if there was none
    async fn purge(&self, uuid: &ResourceKey) -> Result<bool>;

    /// Record for `uuid`
    async fn get(&self, uuid: &ResourceKey) -> Result<Option<MigrationRecord>>;

    /// All records, oldest migration first
    async fn list(&self, active_only: bool) -> Result<Vec<MigrationRecord>>;
}

/// Process-local record store
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<ResourceKey, MigrationRecord>,
}

impl InMemoryRecordStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, active or not
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MigrationRecordStore for InMemoryRecordStore {
    async fn record_migrated(&self, uuid: &ResourceKey, kind: ResourceKind) -> Result<MigrationRecord> {
        let record = self
            .records
            .entry(uuid.clone())
            .and_modify(|record| {
                record.active = true;
                record.resource_kind = kind;
                record.migrated_at = Utc::now();
            })
            .or_insert_with(|| MigrationRecord::new(uuid.clone(), kind))
            .clone();
        tracing::debug!("Recorded migration of {}:{}", kind, uuid);
        Ok(record)
    }

    async fn retire(&self, uuid: &ResourceKey) -> Result<bool> {
        Ok(self
            .records
            .get_mut(uuid)
            .map(|mut record| record.retire())
            .is_some())
    }

    async fn purge(&self, uuid: &ResourceKey) -> Result<bool> {
        Ok(self.records.remove(uuid).is_some())
    }

    async fn get(&self, uuid: &ResourceKey) -> Result<Option<MigrationRecord>> {
        Ok(self.records.get(uuid).map(|record| record.clone()))
    }

    async fn list(&self, active_only: bool) -> Result<Vec<MigrationRecord>> {
        let mut records: Vec<MigrationRecord> = self
            .records
            .iter()
            .filter(|record| !active_only || record.active)
            .map(|record| record.clone())
            .collect();
        records.sort_by(|a, b| a.migrated_at.cmp(&b.migrated_at).then_with(|| a.uuid.cmp(&b.uuid)));
        Ok(records)
    }
}
