//! Testing utilities for the migration workspace
//!
//! In-memory fakes for every collaborator trait plus document fixtures.

#![allow(missing_docs)]

pub mod fixtures;

use async_trait::async_trait;
use dashmap::DashMap;
use mig_core::{ClientError, DeploymentClient, LineageClient, PolicyClient, ResourceClient};
use mig_types::{
    DeploymentStatus, DeploymentVersion, Document, ImportDocument, LineageAction, LineageDirection, LineageEdge,
    ResourceKey, ResourceKind, ResourceRef,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Resource store for one kind in one environment
///
/// Writes store the import payload plus a server-assigned `id` and `uuid`.
#[derive(Debug)]
pub struct InMemoryResourceClient {
    kind: ResourceKind,
    store: DashMap<ResourceKey, Document>,
    failing_writes: DashMap<ResourceKey, ClientError>,
    unavailable: AtomicBool,
    emit_deployments: AtomicBool,
    next_id: AtomicUsize,
    gets: AtomicUsize,
    imports: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryResourceClient {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            store: DashMap::new(),
            failing_writes: DashMap::new(),
            unavailable: AtomicBool::new(false),
            emit_deployments: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
            gets: AtomicUsize::new(0),
            imports: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    /// Seed a resource
    pub fn with_resource(self, key: &str, fields: Value) -> Self {
        self.insert(key, fields);
        self
    }

    /// Writes for `key` fail with `error`
    pub fn fail_writes_for(self, key: &str, error: ClientError) -> Self {
        self.failing_writes.insert(ResourceKey::new(key), error);
        self
    }

    /// Write responses carry a `deploymentId`
    pub fn with_deployments(self) -> Self {
        self.emit_deployments.store(true, Ordering::SeqCst);
        self
    }

    /// Reads fail with 503 while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert(&self, key: &str, fields: Value) {
        let Value::Object(map) = fields else {
            panic!("resource fixture must be an object");
        };
        self.store.insert(ResourceKey::new(key), map);
    }

    pub fn document(&self, key: &str) -> Option<Document> {
        self.store.get(&ResourceKey::new(key)).map(|d| d.clone())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn imports(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn check_write(&self, key: &ResourceKey) -> Result<(), ClientError> {
        match self.failing_writes.get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn store_payload(&self, key: &ResourceKey, doc: &ImportDocument) -> Document {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = match doc.to_payload() {
            Value::Object(map) => map,
            _ => Document::new(),
        };
        stored.insert("id".into(), Value::from(id));
        stored.insert("uuid".into(), Value::from(key.as_str()));
        self.store.insert(key.clone(), stored.clone());

        if self.emit_deployments.load(Ordering::SeqCst) {
            stored.insert("deploymentId".into(), Value::from(format!("dep-{key}-{id}")));
        }
        stored
    }
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn get(&self, key: &ResourceKey) -> Result<Document, ClientError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClientError::status(503, "service unavailable"));
        }
        self.store
            .get(key)
            .map(|d| d.clone())
            .ok_or_else(|| ClientError::not_found(format!("{} {key} not found", self.kind)))
    }

    async fn create(&self, doc: &ImportDocument) -> Result<Document, ClientError> {
        let key = ResourceKey::new(format!("gen-{}", self.next_id.load(Ordering::SeqCst)));
        self.import(&key, doc).await
    }

    async fn update(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document, ClientError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_write(key)?;
        if !self.store.contains_key(key) {
            return Err(ClientError::not_found(format!("{} {key} not found", self.kind)));
        }
        Ok(self.store_payload(key, doc))
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), ClientError> {
        self.store
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(format!("{} {key} not found", self.kind)))
    }

    async fn import(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document, ClientError> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        self.check_write(key)?;
        if self.store.contains_key(key) {
            return Err(ClientError::status(409, format!("{} {key} already exists", self.kind)));
        }
        Ok(self.store_payload(key, doc))
    }
}

/// Fixed lineage graph
#[derive(Debug, Default)]
pub struct StaticLineage {
    edges: Vec<LineageEdge>,
    failing: AtomicBool,
    queries: AtomicUsize,
}

impl StaticLineage {
    pub fn new() -> Self {
        Self::default()
    }

    /// `source` uses `target`
    pub fn uses(self, source: (ResourceKind, &str), target: (ResourceKind, &str)) -> Self {
        self.edge(source, target, LineageAction::Use)
    }

    pub fn edge(mut self, source: (ResourceKind, &str), target: (ResourceKind, &str), action: LineageAction) -> Self {
        self.edges.push(LineageEdge {
            source_key: ResourceKey::new(source.1),
            source_type: source.0,
            target_key: ResourceKey::new(target.1),
            target_type: target.0,
            action,
            depth: 1,
        });
        self
    }

    /// Every query fails with 503
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LineageClient for StaticLineage {
    async fn query(
        &self,
        key: &ResourceKey,
        kind: ResourceKind,
        direction: LineageDirection,
        action: Option<LineageAction>,
        _depth: u32,
    ) -> Result<Vec<LineageEdge>, ClientError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::status(503, "lineage unavailable"));
        }

        let node = ResourceRef::new(kind, key.clone());
        Ok(self
            .edges
            .iter()
            .filter(|e| match direction {
                LineageDirection::Upstream => e.source() == node,
                LineageDirection::Downstream => e.target() == node,
            })
            .filter(|e| action.map_or(true, |a| a == e.action))
            .cloned()
            .collect())
    }
}

/// Policy service recording every binding
#[derive(Debug, Default)]
pub struct RecordingPolicy {
    bindings: Mutex<Vec<(String, i64)>>,
    failing: AtomicBool,
}

impl RecordingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn bindings(&self) -> Vec<(String, i64)> {
        self.bindings.lock().clone()
    }
}

#[async_trait]
impl PolicyClient for RecordingPolicy {
    async fn bind(&self, resource_path: &str, project_seq: i64) -> Result<(), ClientError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::status(500, "policy store down"));
        }
        self.bindings.lock().push((resource_path.to_string(), project_seq));
        Ok(())
    }
}

/// Deployment service answering from a script
///
/// Status answers are consumed in order; the last successful status repeats
/// once the script runs out.
#[derive(Debug)]
pub struct ScriptedDeployments {
    statuses: Mutex<VecDeque<Result<DeploymentStatus, ClientError>>>,
    last: Mutex<DeploymentStatus>,
    versions: Mutex<Vec<DeploymentVersion>>,
    deleted: Mutex<Vec<String>>,
    polls: AtomicUsize,
}

impl ScriptedDeployments {
    pub fn new(statuses: impl IntoIterator<Item = Result<DeploymentStatus, ClientError>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            last: Mutex::new(DeploymentStatus::Pending),
            versions: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    /// Always answer `status`
    pub fn steady(status: DeploymentStatus) -> Self {
        Self::new([Ok(status)])
    }

    pub fn with_version(self, id: &str, version: u64, status: DeploymentStatus) -> Self {
        self.versions.lock().push(DeploymentVersion::new(id, version, status));
        self
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn remaining_versions(&self) -> Vec<String> {
        self.versions.lock().iter().map(|v| v.id.clone()).collect()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeploymentClient for ScriptedDeployments {
    async fn status(&self, _deployment_id: &str) -> Result<DeploymentStatus, ClientError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().pop_front() {
            Some(Ok(status)) => {
                *self.last.lock() = status;
                Ok(status)
            }
            Some(Err(err)) => Err(err),
            None => Ok(*self.last.lock()),
        }
    }

    async fn list_versions(&self, _app: &ResourceKey) -> Result<Vec<DeploymentVersion>, ClientError> {
        Ok(self.versions.lock().clone())
    }

    async fn delete_version(&self, _app: &ResourceKey, deployment_id: &str) -> Result<(), ClientError> {
        let mut versions = self.versions.lock();
        let before = versions.len();
        versions.retain(|v| v.id != deployment_id);
        if versions.len() == before {
            return Err(ClientError::not_found(format!("deployment {deployment_id} not found")));
        }
        self.deleted.lock().push(deployment_id.to_string());
        Ok(())
    }
}
