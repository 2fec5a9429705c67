//! Existence checks against the target environment
//!
//! The gate decides between the import and update write paths. It is
//! optimistic: any failure to read the resource, including an outage, is
//! reported as absence and the subsequent import surfaces the real error.

use crate::guarded::ClientRegistry;
use mig_types::{Document, ResourceKey, ResourceKind};
use std::sync::Arc;

/// Result of probing the target for one resource
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    /// Resource exists; carries its live document
    Present(Document),
    /// Resource was not found or could not be read
    Absent,
}

impl Presence {
    /// Whether the resource exists
    #[inline]
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, Presence::Present(_))
    }

    /// Live document, if present
    #[inline]
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        match self {
            Presence::Present(doc) => Some(doc),
            Presence::Absent => None,
        }
    }
}

/// Probes the target environment
#[derive(Debug, Clone)]
pub struct ExistenceGate {
    target: Arc<ClientRegistry>,
}

impl ExistenceGate {
    /// Gate over the target registry
    #[inline]
    #[must_use]
    pub fn new(target: Arc<ClientRegistry>) -> Self {
        Self { target }
    }

    /// Fetch the live document, or `Absent`
    pub async fn probe(&self, kind: ResourceKind, key: &ResourceKey) -> Presence {
        let client = match self.target.client(kind) {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!("Cannot probe {}:{}: {}", kind, key, err);
                return Presence::Absent;
            }
        };

        match client.get(key).await {
            Ok(doc) => Presence::Present(doc),
            Err(err) if err.is_not_found() => {
                tracing::debug!("{}:{} not present at target", kind, key);
                Presence::Absent
            }
            Err(err) => {
                tracing::warn!("Existence check for {}:{} failed, treating as absent: {}", kind, key, err);
                Presence::Absent
            }
        }
    }

    /// Whether the resource exists at the target
    pub async fn exists(&self, kind: ResourceKind, key: &ResourceKey) -> bool {
        self.probe(kind, key).await.exists()
    }
}
