//! Migration plans
//!
//! A plan is built once per root request, executed in order and discarded.

use crate::kind::{ResourceKey, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};

/// One resource scheduled for migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource key
    pub key: ResourceKey,
    /// Whether the resource already exists at the target
    ///
    /// Filled in by the existence gate during execution.
    pub is_update: bool,
}

impl PlanEntry {
    /// Create a pending entry
    #[inline]
    #[must_use]
    pub fn new(kind: ResourceKind, key: impl Into<ResourceKey>) -> Self {
        Self {
            kind,
            key: key.into(),
            is_update: false,
        }
    }

    /// Reference to the planned resource
    #[inline]
    #[must_use]
    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.key.clone())
    }
}

impl From<ResourceRef> for PlanEntry {
    fn from(value: ResourceRef) -> Self {
        Self::new(value.kind, value.key)
    }
}

/// Ordered list of resources to migrate for one root request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Resource the plan was built for
    pub root: ResourceRef,
    /// Entries in execution order
    pub entries: Vec<PlanEntry>,
}

impl MigrationPlan {
    /// Plan that only migrates the root
    #[inline]
    #[must_use]
    pub fn root_only(root: ResourceRef) -> Self {
        Self {
            entries: vec![PlanEntry::from(root.clone())],
            root,
        }
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the plan is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in execution order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }

    /// Position of a resource in the plan
    #[must_use]
    pub fn position(&self, kind: ResourceKind, key: &ResourceKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.kind == kind && &e.key == key)
    }
}
