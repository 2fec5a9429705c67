use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment defaults injected into every converted document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Target project id, written as `projectId`
    pub project_id: Option<String>,
    /// Target access policy, written as `policy`
    pub policy: Option<Value>,
    /// Audit user recorded as creator and updater
    pub audit_user: Option<String>,
}

impl ConversionOptions {
    /// Create empty options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With target project id
    #[inline]
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// With target policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: Value) -> Self {
        self.policy = Some(policy);
        self
    }

    /// With audit user
    #[inline]
    #[must_use]
    pub fn with_audit_user(mut self, user: impl Into<String>) -> Self {
        self.audit_user = Some(user.into());
        self
    }
}
