//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! project_id = "prod-project"
//! project_seq = 42
//! audit_user = "migrator"
//! lineage_depth = 2
//! direction = "upstream"
//!
//! [reconcile]
//! poll_interval_ms = 5000
//! max_wait_ms = 300000
//! retention = 0
//!
//! [target]
//! base_url = "https://platform.prod.internal/api"
//! token_env = "PROD_API_TOKEN"
//! ```

use crate::error::{MigrationError, Result};
use crate::resolver::DEFAULT_MAX_DEPTH;
use mig_convert::ConversionOptions;
use mig_types::{
    DeploymentWatch, LineageAction, LineageDirection, DEFAULT_MAX_WAIT_MS, DEFAULT_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on lineage hops
pub const MAX_LINEAGE_DEPTH: u32 = 10;

/// Migration engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lineage hops walked when planning
    pub lineage_depth: u32,
    /// Default walk direction
    pub direction: LineageDirection,
    /// Only follow lineage edges with this action
    pub lineage_action: Option<LineageAction>,
    /// Target project id injected into converted documents
    pub project_id: Option<String>,
    /// Target project sequence used for policy binding
    pub project_seq: Option<i64>,
    /// Policy object injected into converted documents
    pub policy: Option<serde_json::Value>,
    /// Identity recorded as creator and updater
    pub audit_user: Option<String>,
    /// Staging area base directory
    pub staging_dir: PathBuf,
    /// Deployment reconciliation
    pub reconcile: ReconcileConfig,
    /// Source environment
    pub source: EnvironmentConfig,
    /// Target environment
    pub target: EnvironmentConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lineage_depth: DEFAULT_MAX_DEPTH,
            direction: LineageDirection::Upstream,
            lineage_action: None,
            project_id: None,
            project_seq: None,
            policy: None,
            audit_user: None,
            staging_dir: PathBuf::from("staging"),
            reconcile: ReconcileConfig::default(),
            source: EnvironmentConfig::default(),
            target: EnvironmentConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate TOML
    ///
    /// # Errors
    /// `Config` if the text is not valid TOML or fails validation
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| MigrationError::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MigrationError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `Config` describing the first offending field
    pub fn validate(&self) -> Result<()> {
        if self.lineage_depth == 0 || self.lineage_depth > MAX_LINEAGE_DEPTH {
            return Err(MigrationError::config(format!(
                "lineage_depth must be within 1..={MAX_LINEAGE_DEPTH}, got {}",
                self.lineage_depth
            )));
        }
        if self.reconcile.poll_interval_ms == 0 {
            return Err(MigrationError::config("reconcile.poll_interval_ms must be positive"));
        }
        if self.reconcile.max_wait_ms < self.reconcile.poll_interval_ms {
            return Err(MigrationError::config(
                "reconcile.max_wait_ms must not be shorter than poll_interval_ms",
            ));
        }
        Ok(())
    }

    /// Options passed to the format converter
    #[must_use]
    pub fn conversion_options(&self) -> ConversionOptions {
        let mut opts = ConversionOptions::new();
        if let Some(project_id) = &self.project_id {
            opts = opts.with_project_id(project_id.as_str());
        }
        if let Some(policy) = &self.policy {
            opts = opts.with_policy(policy.clone());
        }
        if let Some(user) = &self.audit_user {
            opts = opts.with_audit_user(user.as_str());
        }
        opts
    }

    /// Project directory name used by the staging area
    #[must_use]
    pub fn staging_project(&self) -> &str {
        self.project_id.as_deref().unwrap_or("default")
    }

    /// Watch parameters for one deployment
    #[must_use]
    pub fn watch_for(&self, deployment_id: impl Into<String>) -> DeploymentWatch {
        DeploymentWatch::new(deployment_id)
            .with_poll_interval(Duration::from_millis(self.reconcile.poll_interval_ms))
            .with_max_wait(Duration::from_millis(self.reconcile.max_wait_ms))
    }
}

/// Deployment reconciliation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Whether to watch deployments after migrating an application
    pub enabled: bool,
    /// Status poll interval
    pub poll_interval_ms: u64,
    /// Wait ceiling
    pub max_wait_ms: u64,
    /// Stale stable versions to keep
    pub retention: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            retention: 0,
        }
    }
}

/// One platform environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// REST base URL
    pub base_url: String,
    /// Name of the environment variable holding the bearer token
    pub token_env: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token_env: None,
            timeout_secs: 30,
        }
    }
}

impl EnvironmentConfig {
    /// Bearer token read from `token_env`
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|token| !token.is_empty())
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.lineage_depth, 1);
        assert_eq!(config.reconcile.poll_interval_ms, 5_000);
        assert_eq!(config.reconcile.max_wait_ms, 300_000);
        assert_eq!(config.staging_project(), "default");
    }

    #[test]
    fn parses_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            project_id = "prod"
            project_seq = 42
            audit_user = "migrator"
            lineage_depth = 2
            direction = "downstream"
            lineage_action = "USE"

            [policy]
            scope = "project"

            [reconcile]
            retention = 1

            [target]
            base_url = "https://prod.example/api"
            token_env = "PROD_TOKEN"
            "#,
        )
        .unwrap();

        assert_eq!(config.direction, LineageDirection::Downstream);
        assert_eq!(config.lineage_action, Some(LineageAction::Use));
        assert_eq!(config.reconcile.retention, 1);
        assert!(config.reconcile.enabled);
        assert_eq!(config.target.base_url, "https://prod.example/api");
        assert_eq!(config.source, EnvironmentConfig::default());

        let opts = config.conversion_options();
        assert_eq!(opts.project_id.as_deref(), Some("prod"));
        assert_eq!(opts.policy, Some(serde_json::json!({"scope": "project"})));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(EngineConfig::from_toml_str("lineage_depth = 0").is_err());
        assert!(EngineConfig::from_toml_str("[reconcile]\npoll_interval_ms = 0").is_err());
        assert!(EngineConfig::from_toml_str("lineage_depth = \"deep\"").is_err());
    }

    #[test]
    fn watch_uses_reconcile_settings() {
        let mut config = EngineConfig::default();
        config.reconcile.poll_interval_ms = 250;
        let watch = config.watch_for("d-1");
        assert_eq!(watch.poll_interval(), Duration::from_millis(250));
        assert_eq!(watch.max_wait(), Duration::from_secs(300));
    }
}
