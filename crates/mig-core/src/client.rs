//! Collaborator capabilities
//!
//! The engine never talks HTTP itself. Each environment is reached through
//! these traits; adapters live in a separate crate and fakes in the test
//! utilities.
//!
//! - [`ResourceClient`]: per-kind CRUD, one instance per kind and environment
//! - [`LineageClient`]: dependency edges between resources
//! - [`PolicyClient`]: access-policy binding after a write
//! - [`DeploymentClient`]: deployment status and version management

use crate::error::ClientError;
use async_trait::async_trait;
use mig_types::{
    DeploymentStatus, DeploymentVersion, Document, ImportDocument, LineageAction, LineageDirection,
    LineageEdge, ResourceKey, ResourceKind,
};

/// CRUD over one resource kind in one environment
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch a resource in export shape
    async fn get(&self, key: &ResourceKey) -> Result<Document, ClientError>;

    /// Create a resource, the server assigns its key
    async fn create(&self, doc: &ImportDocument) -> Result<Document, ClientError>;

    /// Replace an existing resource
    async fn update(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document, ClientError>;

    /// Delete a resource
    async fn delete(&self, key: &ResourceKey) -> Result<(), ClientError>;

    /// Create a resource under a caller-chosen key
    ///
    /// Kinds without a dedicated import endpoint fall back to `create`.
    async fn import(&self, _key: &ResourceKey, doc: &ImportDocument) -> Result<Document, ClientError> {
        self.create(doc).await
    }
}

/// Dependency edges between resources
#[async_trait]
pub trait LineageClient: Send + Sync {
    /// Edges one hop away from `key` in `direction`
    ///
    /// `depth` is passed through to services that can expand several hops in
    /// one call; the resolver always asks for one.
    async fn query(
        &self,
        key: &ResourceKey,
        kind: ResourceKind,
        direction: LineageDirection,
        action: Option<LineageAction>,
        depth: u32,
    ) -> Result<Vec<LineageEdge>, ClientError>;
}

/// Access-policy binding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Bind a migrated resource to the project's policy
    async fn bind(&self, resource_path: &str, project_seq: i64) -> Result<(), ClientError>;
}

/// Deployment status and version management for agent applications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    /// Current status of one deployment
    async fn status(&self, deployment_id: &str) -> Result<DeploymentStatus, ClientError>;

    /// All deployment versions of an application
    async fn list_versions(&self, app: &ResourceKey) -> Result<Vec<DeploymentVersion>, ClientError>;

    /// Remove one deployment version
    async fn delete_version(&self, app: &ResourceKey, deployment_id: &str) -> Result<(), ClientError>;
}
