//! Deployment reconciliation against scripted deployment services

use mig_core::prelude::*;
use mig_core::{ClientError, PostMigrationReconciler, ReconcileOutcome};
use mig_test_utils::fixtures::{self, Environment};
use mig_test_utils::{ScriptedDeployments, StaticLineage};
use mig_types::{DeploymentStatus, DeploymentWatch};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn deployments_with_history(statuses: Vec<Result<DeploymentStatus, ClientError>>) -> ScriptedDeployments {
    ScriptedDeployments::new(statuses)
        .with_version("v1", 1, DeploymentStatus::Available)
        .with_version("v2", 2, DeploymentStatus::Stopped)
        .with_version("v3", 3, DeploymentStatus::Stopping)
        .with_version("new", 4, DeploymentStatus::Available)
}

#[tokio::test(start_paused = true)]
async fn available_deployment_prunes_stable_versions_only() {
    let deployments = Arc::new(deployments_with_history(vec![
        Ok(DeploymentStatus::Pending),
        Ok(DeploymentStatus::Deploying),
        Ok(DeploymentStatus::Available),
    ]));

    let outcome = PostMigrationReconciler::new(deployments.clone())
        .spawn(ResourceKey::new("bot"), DeploymentWatch::new("new"))
        .join()
        .await;

    assert_eq!(
        outcome,
        ReconcileOutcome::Available {
            removed: vec!["v2".to_string(), "v1".to_string()]
        }
    );
    assert_eq!(deployments.remaining_versions(), vec!["v3", "new"]);
    assert_eq!(deployments.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn retention_keeps_newest_stale_versions() {
    let deployments = Arc::new(deployments_with_history(vec![Ok(DeploymentStatus::Available)]));

    let outcome = PostMigrationReconciler::new(deployments.clone())
        .with_retention(1)
        .spawn(ResourceKey::new("bot"), DeploymentWatch::new("new"))
        .join()
        .await;

    assert_eq!(outcome, ReconcileOutcome::Available { removed: vec!["v1".to_string()] });
    assert_eq!(deployments.deleted(), vec!["v1"]);
}

#[tokio::test(start_paused = true)]
async fn timeout_leaves_every_version_in_place() {
    let deployments = Arc::new(deployments_with_history(vec![Ok(DeploymentStatus::Deploying)]));

    let outcome = PostMigrationReconciler::new(deployments.clone())
        .spawn(ResourceKey::new("bot"), DeploymentWatch::new("new"))
        .join()
        .await;

    assert_eq!(outcome, ReconcileOutcome::TimedOut);
    assert!(deployments.deleted().is_empty());
    assert!(deployments.polls() > 1);
}

#[tokio::test(start_paused = true)]
async fn failed_deployment_leaves_every_version_in_place() {
    let deployments = Arc::new(deployments_with_history(vec![
        Ok(DeploymentStatus::Deploying),
        Ok(DeploymentStatus::Failed),
    ]));

    let outcome = PostMigrationReconciler::new(deployments.clone())
        .spawn(ResourceKey::new("bot"), DeploymentWatch::new("new"))
        .join()
        .await;

    assert_eq!(outcome, ReconcileOutcome::Failed);
    assert_eq!(deployments.remaining_versions().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn status_errors_are_retried() {
    let deployments = Arc::new(deployments_with_history(vec![
        Err(ClientError::status(502, "bad gateway")),
        Err(ClientError::transport("connection reset")),
        Ok(DeploymentStatus::Available),
    ]));

    let outcome = PostMigrationReconciler::new(deployments.clone())
        .spawn(ResourceKey::new("bot"), DeploymentWatch::new("new"))
        .join()
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Available { .. }));
    assert_eq!(deployments.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_task_removes_nothing() {
    let deployments = Arc::new(deployments_with_history(vec![Ok(DeploymentStatus::Deploying)]));

    let handle = PostMigrationReconciler::new(deployments.clone())
        .spawn(ResourceKey::new("bot"), DeploymentWatch::new("new"));
    tokio::time::sleep(Duration::from_secs(20)).await;
    handle.cancellation_token().cancel();

    assert_eq!(handle.join().await, ReconcileOutcome::Cancelled);
    assert!(deployments.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn app_migration_schedules_reconciliation() {
    let source = Environment::new().seed(ResourceKind::AgentApp, "bot", fixtures::custom_app("bot", "registry.dev/bot:3"));
    let target = Environment::new().with_client(
        mig_test_utils::InMemoryResourceClient::new(ResourceKind::AgentApp).with_deployments(),
        ResourceKind::AgentApp,
    );
    // first write of the target app client is assigned id 1
    let deployments = Arc::new(
        ScriptedDeployments::new([Ok(DeploymentStatus::Deploying), Ok(DeploymentStatus::Available)])
            .with_version("old", 1, DeploymentStatus::Available)
            .with_version("dep-bot-1", 2, DeploymentStatus::Available),
    );

    let engine = MigrationEngine::builder(EngineConfig::default())
        .source(source.registry())
        .target(target.registry())
        .lineage(Arc::new(StaticLineage::new()))
        .deployments(deployments.clone())
        .build()
        .unwrap();

    let mut report = engine.migrate(&MigrationRequest::new(ResourceKind::AgentApp, "bot")).await;
    assert!(report.success());
    assert_eq!(report.reconciliations.len(), 1);

    let handle = report.reconciliations.remove(0);
    assert_eq!(handle.deployment_id(), "dep-bot-1");
    assert_eq!(
        handle.join().await,
        ReconcileOutcome::Available {
            removed: vec!["old".to_string()]
        }
    );
}

#[tokio::test]
async fn disabled_reconciliation_starts_no_tasks() {
    let source = Environment::new().seed(ResourceKind::AgentApp, "bot", fixtures::standard_app("bot", "g1"));
    let target = Environment::new().with_client(
        mig_test_utils::InMemoryResourceClient::new(ResourceKind::AgentApp).with_deployments(),
        ResourceKind::AgentApp,
    );
    let mut config = EngineConfig::default();
    config.reconcile.enabled = false;

    let engine = MigrationEngine::builder(config)
        .source(source.registry())
        .target(target.registry())
        .lineage(Arc::new(StaticLineage::new()))
        .deployments(Arc::new(ScriptedDeployments::steady(DeploymentStatus::Available)))
        .build()
        .unwrap();

    let report = engine.migrate(&MigrationRequest::new(ResourceKind::AgentApp, "bot")).await;
    assert!(report.success());
    assert!(report.reconciliations.is_empty());
}
