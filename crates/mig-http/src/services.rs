//! Lineage, policy and deployment adapters
//!
//! ```text
//! GET    lineage?key=&type=&direction=&depth=[&action=]
//! POST   policies/bindings            {"resourcePath", "projectSeq"}
//! GET    deployments/{id}             {"status": ..}
//! GET    agents/apps/{key}/deployments
//! DELETE agents/apps/{key}/deployments/{id}
//! ```

use crate::transport::HttpTransport;
use async_trait::async_trait;
use mig_core::{ClientError, DeploymentClient, LineageClient, PolicyClient};
use mig_types::{
    DeploymentStatus, DeploymentVersion, LineageAction, LineageDirection, LineageEdge, ResourceKey, ResourceKind,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// [`LineageClient`] over the lineage query endpoint
#[derive(Debug, Clone)]
pub struct HttpLineageClient {
    transport: HttpTransport,
}

impl HttpLineageClient {
    /// Create new lineage client
    #[inline]
    #[must_use]
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LineageClient for HttpLineageClient {
    async fn query(
        &self,
        key: &ResourceKey,
        kind: ResourceKind,
        direction: LineageDirection,
        action: Option<LineageAction>,
        depth: u32,
    ) -> Result<Vec<LineageEdge>, ClientError> {
        let mut params = vec![
            ("key", key.to_string()),
            ("type", kind.as_str().to_string()),
            ("direction", direction.as_str().to_string()),
            ("depth", depth.to_string()),
        ];
        if let Some(action) = action {
            params.push(("action", action.as_str().to_string()));
        }

        let url = self.transport.url("lineage", []);
        let request = self.transport.request(Method::GET, url).query(&params);
        self.transport.json(request).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Binding<'a> {
    resource_path: &'a str,
    project_seq: i64,
}

/// [`PolicyClient`] over the policy binding endpoint
#[derive(Debug, Clone)]
pub struct HttpPolicyClient {
    transport: HttpTransport,
}

impl HttpPolicyClient {
    /// Create new policy client
    #[inline]
    #[must_use]
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn bind(&self, resource_path: &str, project_seq: i64) -> Result<(), ClientError> {
        let url = self.transport.url("policies/bindings", []);
        let request = self.transport.request(Method::POST, url).json(&Binding {
            resource_path,
            project_seq,
        });
        self.transport.empty(request).await
    }
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: DeploymentStatus,
}

/// [`DeploymentClient`] over the deployment endpoints
#[derive(Debug, Clone)]
pub struct HttpDeploymentClient {
    transport: HttpTransport,
    apps: String,
}

impl HttpDeploymentClient {
    /// Create new deployment client
    #[must_use]
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            apps: ResourceKind::AgentApp.policy_segment().to_string(),
        }
    }
}

#[async_trait]
impl DeploymentClient for HttpDeploymentClient {
    async fn status(&self, deployment_id: &str) -> Result<DeploymentStatus, ClientError> {
        let url = self.transport.url("deployments", [deployment_id]);
        let reply: StatusReply = self.transport.json(self.transport.request(Method::GET, url)).await?;
        Ok(reply.status)
    }

    async fn list_versions(&self, app: &ResourceKey) -> Result<Vec<DeploymentVersion>, ClientError> {
        let url = self.transport.url(&self.apps, [app.as_str(), "deployments"]);
        self.transport.json(self.transport.request(Method::GET, url)).await
    }

    async fn delete_version(&self, app: &ResourceKey, deployment_id: &str) -> Result<(), ClientError> {
        let url = self
            .transport
            .url(&self.apps, [app.as_str(), "deployments", deployment_id]);
        self.transport.empty(self.transport.request(Method::DELETE, url)).await
    }
}
