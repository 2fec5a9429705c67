use crate::kind::{ResourceKey, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping row for a migrated resource
///
/// Inserted on the first successful migration. `active = false` marks a
/// logically retired resource; rows are only removed by an explicit purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Resource key
    pub uuid: ResourceKey,
    /// Resource kind
    pub resource_kind: ResourceKind,
    /// Whether the record is live
    pub active: bool,
    /// Time of the most recent successful migration
    pub migrated_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// Create an active record stamped now
    #[inline]
    #[must_use]
    pub fn new(uuid: impl Into<ResourceKey>, resource_kind: ResourceKind) -> Self {
        Self {
            uuid: uuid.into(),
            resource_kind,
            active: true,
            migrated_at: Utc::now(),
        }
    }

    /// Mark the record as retired
    #[inline]
    pub fn retire(&mut self) {
        self.active = false;
    }
}
