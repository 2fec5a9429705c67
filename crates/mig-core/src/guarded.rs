//! Error-translating client wrapper and per-environment registry
//!
//! [`GuardedClient`] is the single place where [`ClientError`] becomes
//! [`MigrationError`]; everything above it only sees the engine taxonomy.

use crate::client::ResourceClient;
use crate::error::{ClientError, MigrationError, Result};
use mig_types::{Document, ImportDocument, ResourceKey, ResourceKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Resource client bound to its kind, returning engine errors
#[derive(Clone)]
pub struct GuardedClient {
    kind: ResourceKind,
    inner: Arc<dyn ResourceClient>,
}

impl GuardedClient {
    /// Wrap a raw client
    #[inline]
    #[must_use]
    pub fn new(kind: ResourceKind, inner: Arc<dyn ResourceClient>) -> Self {
        Self { kind, inner }
    }

    /// Kind served by this client
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn translate<T>(&self, key: Option<&ResourceKey>, result: std::result::Result<T, ClientError>) -> Result<T> {
        result.map_err(|err| err.classify(self.kind, key))
    }

    /// Fetch a resource
    ///
    /// # Errors
    /// `NotFound` on 404, `ExternalService` otherwise
    pub async fn get(&self, key: &ResourceKey) -> Result<Document> {
        let span = tracing::debug_span!("resource_get", kind = %self.kind, key = %key);
        let result = self.inner.get(key).instrument(span).await;
        self.translate(Some(key), result)
    }

    /// Create a resource
    ///
    /// # Errors
    /// `NotFound` when a referenced resource is missing, `ExternalService` otherwise
    pub async fn create(&self, doc: &ImportDocument) -> Result<Document> {
        let span = tracing::debug_span!("resource_create", kind = %self.kind);
        let result = self.inner.create(doc).instrument(span).await;
        self.translate(None, result)
    }

    /// Create a resource under the given key
    ///
    /// # Errors
    /// `NotFound` when a referenced resource is missing, `ExternalService` otherwise
    pub async fn import(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document> {
        let span = tracing::debug_span!("resource_import", kind = %self.kind, key = %key);
        let result = self.inner.import(key, doc).instrument(span).await;
        self.translate(Some(key), result)
    }

    /// Replace an existing resource
    ///
    /// # Errors
    /// `NotFound` on 404, `ExternalService` otherwise
    pub async fn update(&self, key: &ResourceKey, doc: &ImportDocument) -> Result<Document> {
        let span = tracing::debug_span!("resource_update", kind = %self.kind, key = %key);
        let result = self.inner.update(key, doc).instrument(span).await;
        self.translate(Some(key), result)
    }

    /// Delete a resource
    ///
    /// # Errors
    /// `NotFound` on 404, `ExternalService` otherwise
    pub async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let span = tracing::debug_span!("resource_delete", kind = %self.kind, key = %key);
        let result = self.inner.delete(key).instrument(span).await;
        self.translate(Some(key), result)
    }
}

impl fmt::Debug for GuardedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedClient").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Resource clients of one environment, keyed by kind
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<ResourceKind, Arc<dyn ResourceClient>>,
}

impl ClientRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, builder style
    #[inline]
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, client: Arc<dyn ResourceClient>) -> Self {
        self.register(kind, client);
        self
    }

    /// Register or replace the client of a kind
    pub fn register(&mut self, kind: ResourceKind, client: Arc<dyn ResourceClient>) {
        self.clients.insert(kind, client);
    }

    /// Client for a kind
    ///
    /// # Errors
    /// `Config` when no client is registered for `kind`
    pub fn client(&self, kind: ResourceKind) -> Result<GuardedClient> {
        self.clients
            .get(&kind)
            .map(|inner| GuardedClient::new(kind, Arc::clone(inner)))
            .ok_or_else(|| MigrationError::config(format!("no client registered for {kind}")))
    }

    /// Whether a client is registered for `kind`
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.clients.contains_key(&kind)
    }

    /// Registered kinds, sorted
    #[must_use]
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<_> = self.clients.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry").field("kinds", &self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl ResourceClient for Unreachable {
        async fn get(&self, key: &ResourceKey) -> std::result::Result<Document, ClientError> {
            Err(ClientError::not_found(format!("{key} does not exist")))
        }

        async fn create(&self, _doc: &ImportDocument) -> std::result::Result<Document, ClientError> {
            Err(ClientError::transport("connection refused"))
        }

        async fn update(
            &self,
            _key: &ResourceKey,
            _doc: &ImportDocument,
        ) -> std::result::Result<Document, ClientError> {
            Err(ClientError::status(409, "duplicate"))
        }

        async fn delete(&self, _key: &ResourceKey) -> std::result::Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn translates_client_errors_once() {
        let registry = ClientRegistry::new().with(ResourceKind::Tool, Arc::new(Unreachable));
        let client = registry.client(ResourceKind::Tool).unwrap();
        let key = ResourceKey::new("t-1");

        let err = client.get(&key).await.unwrap_err();
        assert!(matches!(
            err,
            MigrationError::NotFound { kind: ResourceKind::Tool, key: Some(ref k), .. } if k == &key
        ));

        let doc = ImportDocument::builder(ResourceKind::Tool).build();
        let err = client.import(&key, &doc).await.unwrap_err();
        assert!(err.is_retryable());

        let err = client.update(&key, &doc).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn missing_registration_is_config_error() {
        let registry = ClientRegistry::new();
        let err = registry.client(ResourceKind::Model).unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }
}
