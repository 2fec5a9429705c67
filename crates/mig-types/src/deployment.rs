//! Deployment state observed during post-migration reconciliation

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default ceiling on the total wait
pub const DEFAULT_MAX_WAIT_MS: u64 = 300_000;

/// Lifecycle status reported by the platform for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentStatus {
    /// Accepted, not yet scheduled
    Pending,
    /// Rolling out
    Deploying,
    /// Serving traffic
    Available,
    /// Shutting down
    Stopping,
    /// Shut down
    Stopped,
    /// Rollout failed
    Failed,
    /// Status the engine does not recognise
    Unknown,
}

impl DeploymentStatus {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "PENDING",
            DeploymentStatus::Deploying => "DEPLOYING",
            DeploymentStatus::Available => "AVAILABLE",
            DeploymentStatus::Stopping => "STOPPING",
            DeploymentStatus::Stopped => "STOPPED",
            DeploymentStatus::Failed => "FAILED",
            DeploymentStatus::Unknown => "UNKNOWN",
        }
    }

    /// Stable states are the only ones eligible for cleanup
    #[inline]
    #[must_use]
    pub fn is_stable(&self) -> bool {
        matches!(self, DeploymentStatus::Available | DeploymentStatus::Stopped)
    }

    /// Terminal from the point of view of a watch on a new deployment
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Available | DeploymentStatus::Failed)
    }
}

impl From<&str> for DeploymentStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "CREATED" => DeploymentStatus::Pending,
            "DEPLOYING" | "PROGRESSING" | "STARTING" => DeploymentStatus::Deploying,
            "AVAILABLE" | "RUNNING" | "READY" => DeploymentStatus::Available,
            "STOPPING" | "TERMINATING" => DeploymentStatus::Stopping,
            "STOPPED" => DeploymentStatus::Stopped,
            "FAILED" | "ERROR" => DeploymentStatus::Failed,
            _ => DeploymentStatus::Unknown,
        }
    }
}

impl From<String> for DeploymentStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<DeploymentStatus> for String {
    fn from(value: DeploymentStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for DeploymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version of an application's deployment history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentVersion {
    /// Deployment identifier
    pub id: String,
    /// Monotonically increasing version number
    pub version: u64,
    /// Current status
    pub status: DeploymentStatus,
}

impl DeploymentVersion {
    /// Create new version entry
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, version: u64, status: DeploymentStatus) -> Self {
        Self {
            id: id.into(),
            version,
            status,
        }
    }
}

/// Parameters of one background watch on a freshly created deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentWatch {
    /// Deployment being watched
    pub deployment_id: String,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Ceiling on the total wait in milliseconds
    pub max_wait_ms: u64,
}

impl DeploymentWatch {
    /// Watch with default interval (5s) and ceiling (300s)
    #[inline]
    #[must_use]
    pub fn new(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
        }
    }

    /// With polling interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With wait ceiling
    #[inline]
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait_ms = u64::try_from(max_wait.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Polling interval, never zero
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Wait ceiling
    #[inline]
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}
