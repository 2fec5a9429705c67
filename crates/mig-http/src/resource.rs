//! Per-kind resource adapter

use crate::transport::HttpTransport;
use async_trait::async_trait;
use mig_convert::AppVariant;
use mig_core::{ClientError, ResourceClient};
use mig_types::{Document, ImportDocument, ResourceKey, ResourceKind};
use reqwest::Method;
use serde_json::Value;

/// REST collection paths of one resource kind
///
/// ```text
/// GET    {collection}/{key}
/// POST   {collection}
/// PUT    {collection}/{key}
/// DELETE {collection}/{key}
/// POST   {collection}/{key}/import
/// ```
///
/// Agent applications split their write endpoints: custom applications are
/// created under `custom_collection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Collection path relative to the base URL
    pub collection: String,
    /// Write collection for custom agent applications
    pub custom_collection: Option<String>,
}

impl Routes {
    /// Default route table entry for a kind
    #[must_use]
    pub fn for_kind(kind: ResourceKind) -> Self {
        let collection = kind.policy_segment().to_string();
        let custom_collection = match kind {
            ResourceKind::AgentApp => Some(format!("{collection}/custom")),
            _ => None,
        };
        Self {
            collection,
            custom_collection,
        }
    }

    /// Override the collection path
    #[inline]
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Collection a document is written to
    #[must_use]
    pub fn write_collection(&self, doc: &ImportDocument) -> &str {
        match (&self.custom_collection, AppVariant::from_app_type(doc.get("appType"))) {
            (Some(custom), AppVariant::Custom) => custom,
            _ => &self.collection,
        }
    }
}

/// [`ResourceClient`] over the platform REST API
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    kind: ResourceKind,
    routes: Routes,
    transport: HttpTransport,
}

impl HttpResourceClient {
    /// Client for `kind` using the default routes
    #[must_use]
    pub fn new(kind: ResourceKind, transport: HttpTransport) -> Self {
        Self {
            kind,
            routes: Routes::for_kind(kind),
            transport,
        }
    }

    /// Replace the route table entry
    #[inline]
    #[must_use]
    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    /// Active routes
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    async fn write(&self, method: Method, route: &str, segments: &[&str], doc: &ImportDocument) -> Result<Document, ClientError> {
        let url = self.transport.url(route, segments.iter().copied());
        tracing::debug!("{} {} ({})", method, url, self.kind);
        let reply: Value = self.transport.send_json(method, url, &doc.to_payload()).await?;
        into_document(reply)
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get(&self, key: &ResourceKey) -> Result<Document, ClientError> {
        let url = self.transport.url(&self.routes.collection, [key.as_str()]);
        let reply: Value = self.transport.json(self.transport.request(Method::GET, url)).await?;
        into_document(reply)
    }

    async fn create(&self, doc: &ImportDocument) -> Result<Document, ClientError> {
        self.write(Method::POST, self.routes.write_collection(doc), &[], doc).await
    }

    async fn update(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document, ClientError> {
        self.write(Method::PUT, &self.routes.collection, &[key.as_str()], doc)
            .await
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), ClientError> {
        let url = self.transport.url(&self.routes.collection, [key.as_str()]);
        self.transport.empty(self.transport.request(Method::DELETE, url)).await
    }

    async fn import(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document, ClientError> {
        self.write(Method::POST, self.routes.write_collection(doc), &[key.as_str(), "import"], doc)
            .await
    }
}

/// Unwrap the resource object, accepting a `{"data": {..}}` envelope
fn into_document(reply: Value) -> Result<Document, ClientError> {
    match reply {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(inner)) if map.is_empty() => Ok(inner),
            Some(other) => {
                map.insert("data".into(), other);
                Ok(map)
            }
            None => Ok(map),
        },
        Value::Null => Ok(Document::new()),
        other => Err(ClientError::transport(format!("expected a JSON object, got {other}"))),
    }
}
