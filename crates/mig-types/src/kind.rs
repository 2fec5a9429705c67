//! Resource identity
//!
//! Provides [`ResourceKind`], [`ResourceKey`] and the pair [`ResourceRef`].

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Kind of portal resource that can be migrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Project owning the other resources
    Project,
    /// Agent graph definition
    AgentGraph,
    /// Deployed agent application
    AgentApp,
    /// Agent tool
    Tool,
    /// Prompt template
    Prompt,
    /// Few-shot example set
    FewShot,
    /// Guardrail policy
    Guardrail,
    /// Model serving
    Model,
    /// Vector database connection
    VectorDb,
    /// MCP server catalog entry
    McpCatalog,
}

impl ResourceKind {
    /// All kinds, in declaration order
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Project,
        ResourceKind::AgentGraph,
        ResourceKind::AgentApp,
        ResourceKind::Tool,
        ResourceKind::Prompt,
        ResourceKind::FewShot,
        ResourceKind::Guardrail,
        ResourceKind::Model,
        ResourceKind::VectorDb,
        ResourceKind::McpCatalog,
    ];

    /// Wire name used by lineage and payloads
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::AgentGraph => "agent_graph",
            ResourceKind::AgentApp => "agent_app",
            ResourceKind::Tool => "tool",
            ResourceKind::Prompt => "prompt",
            ResourceKind::FewShot => "few_shot",
            ResourceKind::Guardrail => "guardrail",
            ResourceKind::Model => "model",
            ResourceKind::VectorDb => "vector_db",
            ResourceKind::McpCatalog => "mcp_catalog",
        }
    }

    /// Path segment used when binding policies to a resource of this kind
    #[inline]
    #[must_use]
    pub fn policy_segment(&self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::AgentGraph => "agents/graphs",
            ResourceKind::AgentApp => "agents/apps",
            ResourceKind::Tool => "agents/tools",
            ResourceKind::Prompt => "agents/prompts",
            ResourceKind::FewShot => "agents/few-shots",
            ResourceKind::Guardrail => "agents/guardrails",
            ResourceKind::Model => "models/servings",
            ResourceKind::VectorDb => "vectordbs",
            ResourceKind::McpCatalog => "mcp/catalogs",
        }
    }

    /// Check if this is the project kind
    #[inline]
    #[must_use]
    pub fn is_project(&self) -> bool {
        matches!(self, ResourceKind::Project)
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let kind = match normalized.as_str() {
            "project" => ResourceKind::Project,
            "agent_graph" | "graph" => ResourceKind::AgentGraph,
            "agent_app" | "app" => ResourceKind::AgentApp,
            "tool" | "agent_tool" => ResourceKind::Tool,
            "prompt" => ResourceKind::Prompt,
            "few_shot" | "fewshot" => ResourceKind::FewShot,
            "guardrail" => ResourceKind::Guardrail,
            "model" | "serving" => ResourceKind::Model,
            "vector_db" | "vectordb" => ResourceKind::VectorDb,
            "mcp_catalog" | "mcp" => ResourceKind::McpCatalog,
            _ => return Err(TypeError::UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Environment-independent identifier of a resource
///
/// The same key names the resource in every environment, which is what makes
/// create-or-update idempotent across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Create a key without validation
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyKey);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A (kind, key) pair naming one resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource key
    pub key: ResourceKey,
}

impl ResourceRef {
    /// Create new reference
    #[inline]
    #[must_use]
    pub fn new(kind: ResourceKind, key: impl Into<ResourceKey>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }

    /// Resource path used for policy binding, e.g. `agents/tools/abc`
    #[inline]
    #[must_use]
    pub fn policy_path(&self) -> String {
        format!("{}/{}", self.kind.policy_segment(), self.key)
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}
