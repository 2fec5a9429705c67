//! Export-shaped document fixtures

use mig_core::{ClientRegistry, ResourceClient};
use mig_types::{Document, ExportedDocument, ResourceKind};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::InMemoryResourceClient;

/// Unwrap a JSON object literal
pub fn doc(fields: Value) -> Document {
    match fields {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

pub fn export(kind: ResourceKind, key: &str, fields: Value) -> ExportedDocument {
    ExportedDocument::new(kind, key, doc(fields))
}

pub fn project(name: &str) -> Value {
    json!({
        "uuid": name,
        "projectSeq": 3,
        "projectName": name,
        "projectDesc": "migrated project",
        "createdBy": "dev-user",
        "createdAt": "2024-03-01T10:00:00Z"
    })
}

pub fn tool(name: &str, endpoint: &str) -> Value {
    json!({
        "uuid": name,
        "id": 11,
        "toolSeq": 7,
        "toolName": name,
        "toolType": "api",
        "endpoint": endpoint,
        "authorization": {"type": "bearer", "url": format!("{endpoint}/auth")},
        "projectId": "dev-project",
        "createdBy": "dev-user",
        "updatedBy": "dev-user"
    })
}

pub fn prompt(name: &str) -> Value {
    json!({
        "uuid": name,
        "promptName": name,
        "promptMsgs": [{"role": "system", "content": "be brief"}],
        "promptVariables": ["topic"],
        "createdBy": "dev-user"
    })
}

pub fn model(name: &str, endpoint: &str) -> Value {
    json!({
        "uuid": name,
        "servingName": name,
        "modelName": "llama-3-8b",
        "endpoint": endpoint,
        "imageUrl": "registry.dev/serving:1"
    })
}

pub fn few_shot(name: &str) -> Value {
    json!({
        "uuid": name,
        "fewShotSeq": 2,
        "fewShotName": name,
        "items": [
            {"sequence": 1, "type": "Q", "content": "hi"},
            {"sequence": 1, "type": "A", "content": "hello"},
            {"sequence": 2, "type": "Q", "content": "bye"}
        ]
    })
}

pub fn standard_app(name: &str, graph: &str) -> Value {
    json!({
        "uuid": name,
        "appName": name,
        "appStatus": "RUNNING",
        "versions": [
            {"version": 1, "release": true, "graphUuid": graph},
            {"version": 2, "release": false, "graphUuid": graph}
        ],
        "deployments": [{"id": "dev-d1", "version": 1, "targetType": "agent_graph"}]
    })
}

pub fn custom_app(name: &str, image: &str) -> Value {
    json!({
        "uuid": name,
        "appName": name,
        "versions": [{"version": 3, "release": true, "description": "ga"}],
        "deployments": [{
            "id": "dev-d3",
            "version": 3,
            "targetType": "external_graph",
            "imageUrl": image,
            "modelList": ["llama-3-8b"],
            "useExternalRegistry": false,
            "workersPerCore": 1
        }]
    })
}

/// One in-memory client per kind, with handles kept for assertions
#[derive(Debug)]
pub struct Environment {
    clients: Vec<(ResourceKind, Arc<InMemoryResourceClient>)>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            clients: ResourceKind::ALL
                .iter()
                .map(|kind| (*kind, Arc::new(InMemoryResourceClient::new(*kind))))
                .collect(),
        }
    }

    /// Replace the client of a kind
    pub fn with_client(mut self, client: InMemoryResourceClient, kind: ResourceKind) -> Self {
        self.clients.retain(|(k, _)| *k != kind);
        self.clients.push((kind, Arc::new(client)));
        self
    }

    pub fn seed(self, kind: ResourceKind, key: &str, fields: Value) -> Self {
        self.client(kind).insert(key, fields);
        self
    }

    pub fn client(&self, kind: ResourceKind) -> &Arc<InMemoryResourceClient> {
        &self
            .clients
            .iter()
            .find(|(k, _)| *k == kind)
            .unwrap_or_else(|| panic!("no client for {kind}"))
            .1
    }

    pub fn registry(&self) -> ClientRegistry {
        self.clients.iter().fold(ClientRegistry::new(), |registry, (kind, client)| {
            registry.with(*kind, Arc::clone(client) as Arc<dyn ResourceClient>)
        })
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
