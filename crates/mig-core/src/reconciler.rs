//! Post-migration deployment reconciliation
//!
//! After an agent application is written to the target a new deployment
//! version starts rolling out. The reconciler polls that deployment in a
//! background task and, once it is available, removes stale versions:
//! - only versions in a stable state are candidates
//! - the newest version and the watched deployment are never removed
//! - a failed deployment or an exhausted wait removes nothing
//!
//! The task is cancellable through the [`CancellationToken`] held by the
//! returned [`ReconcileHandle`].

use crate::client::DeploymentClient;
use mig_types::{DeploymentStatus, DeploymentVersion, DeploymentWatch, ResourceKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Final state of one reconciliation task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Deployment became available; lists removed version ids
    Available {
        /// Removed deployment ids
        removed: Vec<String>,
    },
    /// Deployment failed; prior versions kept
    Failed,
    /// Wait exhausted; prior versions kept
    TimedOut,
    /// Cancelled by the caller; prior versions kept
    Cancelled,
}

/// Handle to a running reconciliation
#[derive(Debug)]
pub struct ReconcileHandle {
    app: ResourceKey,
    deployment_id: String,
    token: CancellationToken,
    task: JoinHandle<ReconcileOutcome>,
}

impl ReconcileHandle {
    /// Application being reconciled
    #[inline]
    #[must_use]
    pub fn app(&self) -> &ResourceKey {
        &self.app
    }

    /// Deployment being watched
    #[inline]
    #[must_use]
    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    /// Request cancellation; the task stops at its next wait
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token controlling the task
    #[inline]
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the task has finished
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to finish
    pub async fn join(self) -> ReconcileOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!("Reconciliation task for {} aborted: {}", self.app, err);
                ReconcileOutcome::Cancelled
            }
        }
    }
}

/// Polls new deployments and removes stale versions
#[derive(Clone)]
pub struct PostMigrationReconciler {
    deployments: Arc<dyn DeploymentClient>,
    retention: usize,
}

impl PostMigrationReconciler {
    /// Reconciler keeping no extra stable versions
    #[inline]
    #[must_use]
    pub fn new(deployments: Arc<dyn DeploymentClient>) -> Self {
        Self {
            deployments,
            retention: 0,
        }
    }

    /// Keep this many stale stable versions besides the newest one
    #[inline]
    #[must_use]
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    /// Start reconciling in the background
    #[must_use]
    pub fn spawn(&self, app: ResourceKey, watch: DeploymentWatch) -> ReconcileHandle {
        self.spawn_with_token(app, watch, CancellationToken::new())
    }

    /// Start reconciling under an existing cancellation token
    #[must_use]
    pub fn spawn_with_token(&self, app: ResourceKey, watch: DeploymentWatch, token: CancellationToken) -> ReconcileHandle {
        let this = self.clone();
        let task_app = app.clone();
        let task_token = token.clone();
        let deployment_id = watch.deployment_id.clone();

        tracing::info!("Watching deployment {} of {}", deployment_id, app);
        let task = tokio::spawn(async move { this.run(&task_app, &watch, &task_token).await });

        ReconcileHandle {
            app,
            deployment_id,
            token,
            task,
        }
    }

    /// Poll until the deployment settles, the wait runs out, or `cancel` fires
    pub async fn run(&self, app: &ResourceKey, watch: &DeploymentWatch, cancel: &CancellationToken) -> ReconcileOutcome {
        let started = Instant::now();
        let deadline = started + watch.max_wait();

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Reconciliation of {} cancelled", app);
                return ReconcileOutcome::Cancelled;
            }

            match self.deployments.status(&watch.deployment_id).await {
                Ok(DeploymentStatus::Available) => {
                    let removed = self.remove_stale(app, &watch.deployment_id).await;
                    tracing::info!(
                        "Deployment {} of {} available, removed {} stale versions",
                        watch.deployment_id,
                        app,
                        removed.len()
                    );
                    return ReconcileOutcome::Available { removed };
                }
                Ok(DeploymentStatus::Failed) => {
                    tracing::warn!(
                        "Deployment {} of {} failed, keeping prior versions",
                        watch.deployment_id,
                        app
                    );
                    return ReconcileOutcome::Failed;
                }
                Ok(status) => tracing::debug!("Deployment {} is {}", watch.deployment_id, status),
                Err(err) => tracing::warn!("Status poll for deployment {} failed: {}", watch.deployment_id, err),
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    "Deployment {} of {} not available after {}s, keeping prior versions",
                    watch.deployment_id,
                    app,
                    (now - started).as_secs()
                );
                return ReconcileOutcome::TimedOut;
            }

            let wait = watch.poll_interval().min(deadline - now);
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Reconciliation of {} cancelled", app);
                    return ReconcileOutcome::Cancelled;
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn remove_stale(&self, app: &ResourceKey, current_id: &str) -> Vec<String> {
        let versions = match self.deployments.list_versions(app).await {
            Ok(versions) => versions,
            Err(err) => {
                tracing::warn!("Cannot list versions of {}, skipping cleanup: {}", app, err);
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for stale in stale_versions(&versions, current_id, self.retention) {
            match self.deployments.delete_version(app, &stale.id).await {
                Ok(()) => {
                    tracing::debug!("Removed version {} ({}) of {}", stale.version, stale.id, app);
                    removed.push(stale.id.clone());
                }
                Err(err) => tracing::warn!("Failed to remove version {} of {}: {}", stale.id, app, err),
            }
        }
        removed
    }
}

impl std::fmt::Debug for PostMigrationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostMigrationReconciler")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

/// Versions eligible for removal, newest first, after skipping `retention`
fn stale_versions<'a>(versions: &'a [DeploymentVersion], current_id: &str, retention: usize) -> Vec<&'a DeploymentVersion> {
    let newest = versions.iter().map(|v| v.version).max();

    let mut candidates: Vec<&DeploymentVersion> = versions
        .iter()
        .filter(|v| v.id != current_id && Some(v.version) != newest && v.status.is_stable())
        .collect();
    candidates.sort_by(|a, b| b.version.cmp(&a.version));
    candidates.into_iter().skip(retention).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockDeploymentClient;
    use crate::error::ClientError;
    use std::time::Duration;

    fn version(id: &str, version: u64, status: DeploymentStatus) -> DeploymentVersion {
        DeploymentVersion::new(id, version, status)
    }

    #[test]
    fn stale_versions_skip_newest_current_and_in_flight() {
        let versions = vec![
            version("d1", 1, DeploymentStatus::Available),
            version("d2", 2, DeploymentStatus::Stopped),
            version("d3", 3, DeploymentStatus::Deploying),
            version("d4", 4, DeploymentStatus::Available),
        ];

        let ids: Vec<_> = stale_versions(&versions, "d4", 0).iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["d2", "d1"]);

        let ids: Vec<_> = stale_versions(&versions, "d4", 1).iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["d1"]);
    }

    #[test]
    fn current_deployment_is_never_stale() {
        let versions = vec![
            version("new", 1, DeploymentStatus::Available),
            version("old", 5, DeploymentStatus::Available),
        ];
        assert!(stale_versions(&versions, "new", 0).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_deployment_keeps_versions() {
        let mut client = MockDeploymentClient::new();
        client
            .expect_status()
            .times(1)
            .returning(|_| Ok(DeploymentStatus::Failed));
        client.expect_list_versions().never();
        client.expect_delete_version().never();

        let outcome = PostMigrationReconciler::new(Arc::new(client))
            .run(&ResourceKey::new("app"), &DeploymentWatch::new("d9"), &CancellationToken::new())
            .await;

        assert_eq!(outcome, ReconcileOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_errors_keep_polling() {
        let mut client = MockDeploymentClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_status()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(ClientError::transport("reset")));
        client
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(DeploymentStatus::Available));
        client
            .expect_list_versions()
            .times(1)
            .returning(|_| Ok(vec![DeploymentVersion::new("d9", 2, DeploymentStatus::Available)]));

        let outcome = PostMigrationReconciler::new(Arc::new(client))
            .run(&ResourceKey::new("app"), &DeploymentWatch::new("d9"), &CancellationToken::new())
            .await;

        assert_eq!(outcome, ReconcileOutcome::Available { removed: vec![] });
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_wait_times_out_without_cleanup() {
        let mut client = MockDeploymentClient::new();
        client
            .expect_status()
            .returning(|_| Ok(DeploymentStatus::Deploying));
        client.expect_list_versions().never();

        let watch = DeploymentWatch::new("d9")
            .with_poll_interval(Duration::from_secs(5))
            .with_max_wait(Duration::from_secs(30));
        let outcome = PostMigrationReconciler::new(Arc::new(client))
            .run(&ResourceKey::new("app"), &watch, &CancellationToken::new())
            .await;

        assert_eq!(outcome, ReconcileOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_task() {
        let mut client = MockDeploymentClient::new();
        client
            .expect_status()
            .returning(|_| Ok(DeploymentStatus::Pending));
        client.expect_list_versions().never();

        let handle = PostMigrationReconciler::new(Arc::new(client)).spawn(ResourceKey::new("app"), DeploymentWatch::new("d9"));
        tokio::time::sleep(Duration::from_secs(12)).await;
        handle.cancel();

        assert_eq!(handle.join().await, ReconcileOutcome::Cancelled);
    }
}
