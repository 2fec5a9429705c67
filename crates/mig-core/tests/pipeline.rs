//! End-to-end migration pipeline against in-memory environments

use mig_convert::FormatConverter;
use mig_core::prelude::*;
use mig_core::{ClientError, ErrorClass, Presence, WritePath};
use mig_test_utils::fixtures::{self, Environment};
use mig_test_utils::{InMemoryResourceClient, RecordingPolicy, StaticLineage};
use mig_types::{ExportedDocument, FieldDiff};
use pretty_assertions::assert_eq;
use serde_json::json;

fn config() -> EngineConfig {
    EngineConfig {
        project_id: Some("prod-project".into()),
        audit_user: Some("migrator".into()),
        ..EngineConfig::default()
    }
}

fn engine(source: &Environment, target: &Environment, lineage: StaticLineage) -> MigrationEngine {
    engine_with(config(), source, target, lineage)
}

fn engine_with(config: EngineConfig, source: &Environment, target: &Environment, lineage: StaticLineage) -> MigrationEngine {
    MigrationEngine::builder(config)
        .source(source.registry())
        .target(target.registry())
        .lineage(Arc::new(lineage))
        .build()
        .unwrap()
}

#[tokio::test]
async fn migration_is_idempotent() {
    let source = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev/search"));
    let target = Environment::new();
    let engine = engine(&source, &target, StaticLineage::new());
    let request = MigrationRequest::new(ResourceKind::Tool, "t1").without_dependencies();

    let first = engine.migrate(&request).await;
    let second = engine.migrate(&request).await;

    assert!(first.success() && second.success());
    assert_eq!(first.result.outcomes[0].path, WritePath::Import);
    assert_eq!(second.result.outcomes[0].path, WritePath::Update);
    assert!(second.result.outcomes[0].entry.is_update);

    let tools = target.client(ResourceKind::Tool);
    assert_eq!(tools.len(), 1);
    assert_eq!((tools.imports(), tools.updates()), (1, 1));
    assert_eq!(engine.records().list(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn partial_failure_reports_four_of_five() {
    let source = Environment::new()
        .seed(ResourceKind::Project, "proj", fixtures::project("proj"))
        .seed(ResourceKind::Tool, "search", fixtures::tool("search", "http://dev/search"))
        .seed(ResourceKind::Prompt, "greet", fixtures::prompt("greet"))
        .seed(ResourceKind::Model, "llm", fixtures::model("llm", "http://dev/llm"))
        .seed(ResourceKind::AgentApp, "bot", fixtures::standard_app("bot", "g1"));
    let target = Environment::new().with_client(
        InMemoryResourceClient::new(ResourceKind::Model)
            .fail_writes_for("llm", ClientError::not_found("image registry entry missing")),
        ResourceKind::Model,
    );
    let lineage = StaticLineage::new()
        .uses((ResourceKind::AgentApp, "bot"), (ResourceKind::Tool, "search"))
        .uses((ResourceKind::AgentApp, "bot"), (ResourceKind::Prompt, "greet"))
        .uses((ResourceKind::AgentApp, "bot"), (ResourceKind::Model, "llm"))
        .uses((ResourceKind::AgentApp, "bot"), (ResourceKind::Project, "proj"));

    let report = engine(&source, &target, lineage)
        .migrate(&MigrationRequest::new(ResourceKind::AgentApp, "bot"))
        .await;

    let order: Vec<_> = report.plan.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(order, vec!["proj", "search", "greet", "llm", "bot"]);

    assert_eq!(report.result.succeeded_count(), 4);
    assert_eq!(report.result.failed_count(), 1);
    assert!(!report.success());
    assert!(report.result.success_ignoring_missing_references());

    let failed: Vec<_> = report.result.failures().map(|o| o.entry.key.as_str()).collect();
    assert_eq!(failed, vec!["llm"]);

    assert!(target.client(ResourceKind::AgentApp).document("bot").is_some());
    assert!(target.client(ResourceKind::Project).document("proj").is_some());
}

#[tokio::test]
async fn invalid_source_document_fails_only_its_entry() {
    let mut broken = fixtures::tool("broken", "http://dev/x");
    broken.as_object_mut().unwrap().remove("toolType");
    let source = Environment::new()
        .seed(ResourceKind::Tool, "broken", broken)
        .seed(ResourceKind::Prompt, "greet", fixtures::prompt("greet"));
    let target = Environment::new();
    let lineage = StaticLineage::new().uses((ResourceKind::Prompt, "greet"), (ResourceKind::Tool, "broken"));

    let report = engine(&source, &target, lineage)
        .migrate(&MigrationRequest::new(ResourceKind::Prompt, "greet"))
        .await;

    let failure = report.result.outcomes[0].failure.as_ref().unwrap();
    assert_eq!(failure.class, ErrorClass::Validation);
    assert!(!failure.missing_reference);
    assert!(report.result.outcomes[1].succeeded());
    assert!(target.client(ResourceKind::Tool).is_empty());
}

#[tokio::test]
async fn absent_source_root_is_a_hard_failure() {
    let target = Environment::new();

    let report = engine(&Environment::new(), &target, StaticLineage::new())
        .migrate(&MigrationRequest::new(ResourceKind::Tool, "typo-does-not-exist"))
        .await;

    assert_eq!(report.plan.len(), 1);
    assert!(!report.success());
    assert!(!report.result.success_ignoring_missing_references());
    assert_eq!(report.result.succeeded_count(), 0);

    let failure = report.result.outcomes[0].failure.as_ref().unwrap();
    assert_eq!(failure.class, ErrorClass::NotFound);
    assert!(!failure.missing_reference);
    assert!(failure.message.contains("not found at the source"));
    assert!(target.client(ResourceKind::Tool).is_empty());
}

#[tokio::test]
async fn lineage_outage_migrates_root_only() {
    let source = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev"));
    let target = Environment::new();

    let report = engine(&source, &target, StaticLineage::new().failing())
        .migrate(&MigrationRequest::new(ResourceKind::Tool, "t1"))
        .await;

    assert_eq!(report.plan.len(), 1);
    assert!(report.success());
}

#[tokio::test]
async fn review_pairs_dev_and_prod_values() {
    let source = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev/search"));
    let target = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://prod/search"));
    let engine = engine(&source, &target, StaticLineage::new());

    let review = engine.review(ResourceKind::Tool, &ResourceKey::new("t1")).await.unwrap();

    assert!(review.exists);
    assert_eq!(
        review.diffs,
        vec![
            FieldDiff::new("endpoint", json!("http://dev/search"), json!("http://prod/search")),
            FieldDiff::new(
                "authorization.url",
                json!("http://dev/search/auth"),
                json!("http://prod/search/auth")
            ),
        ]
    );
}

#[tokio::test]
async fn overrides_write_reviewed_prod_values() {
    let source = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev/search"));
    let target = Environment::new();
    let engine = engine(&source, &target, StaticLineage::new());

    let request = MigrationRequest::new(ResourceKind::Tool, "t1").with_override(
        ResourceKind::Tool,
        "t1",
        vec![FieldDiff::new("endpoint", json!("http://dev/search"), json!("http://prod/search"))],
    );
    assert!(engine.migrate(&request).await.success());

    let stored = target.client(ResourceKind::Tool).document("t1").unwrap();
    assert_eq!(stored["endpoint"], json!("http://prod/search"));
    assert_eq!(stored["projectId"], json!("prod-project"));
    assert_eq!(stored["createdBy"], json!("migrator"));
}

#[tokio::test]
async fn successful_entries_are_bound_to_project_policy() {
    let source = Environment::new()
        .seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev"))
        .seed(ResourceKind::Prompt, "p1", fixtures::prompt("p1"));
    let target = Environment::new();
    let lineage = StaticLineage::new().uses((ResourceKind::Prompt, "p1"), (ResourceKind::Tool, "t1"));
    let policy = Arc::new(RecordingPolicy::new());

    let engine = MigrationEngine::builder(EngineConfig {
        project_seq: Some(42),
        ..config()
    })
    .source(source.registry())
    .target(target.registry())
    .lineage(Arc::new(lineage))
    .policy(policy.clone())
    .build()
    .unwrap();

    assert!(engine.migrate(&MigrationRequest::new(ResourceKind::Prompt, "p1")).await.success());
    assert_eq!(
        policy.bindings(),
        vec![("agents/tools/t1".to_string(), 42), ("agents/prompts/p1".to_string(), 42)]
    );
}

#[tokio::test]
async fn failed_policy_binding_keeps_entry_successful() {
    let source = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev"));
    let target = Environment::new();

    let engine = MigrationEngine::builder(EngineConfig {
        project_seq: Some(42),
        ..config()
    })
    .source(source.registry())
    .target(target.registry())
    .lineage(Arc::new(StaticLineage::new()))
    .policy(Arc::new(RecordingPolicy::new().failing()))
    .build()
    .unwrap();

    assert!(engine.migrate(&MigrationRequest::new(ResourceKind::Tool, "t1")).await.success());
}

#[tokio::test]
async fn existence_gate_treats_outage_as_absent() {
    let source = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev"));
    let target = Environment::new().seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://prod"));
    target.client(ResourceKind::Tool).set_unavailable(true);
    let engine = engine(&source, &target, StaticLineage::new());

    let review = engine.review(ResourceKind::Tool, &ResourceKey::new("t1")).await.unwrap();
    assert!(!review.exists);

    // the import then hits the existing row and surfaces the conflict
    let report = engine.migrate(&MigrationRequest::new(ResourceKind::Tool, "t1")).await;
    let outcome = &report.result.outcomes[0];
    assert_eq!(outcome.path, WritePath::Import);
    assert_eq!(outcome.failure.as_ref().unwrap().class, ErrorClass::ExternalService);
}

#[tokio::test]
async fn converted_documents_survive_a_round_trip() {
    let source = Environment::new()
        .seed(ResourceKind::Tool, "t1", fixtures::tool("t1", "http://dev"))
        .seed(ResourceKind::Prompt, "p1", fixtures::prompt("p1"));
    let target = Environment::new();
    let engine = engine(&source, &target, StaticLineage::new());
    let converter = FormatConverter::new();
    let opts = engine.config().conversion_options();

    for (kind, key) in [(ResourceKind::Tool, "t1"), (ResourceKind::Prompt, "p1")] {
        let key = ResourceKey::new(key);
        assert!(engine.migrate(&MigrationRequest::new(kind, key.clone())).await.success());

        let original = engine.prepare(kind, &key).await.unwrap();
        let live = target.client(kind).document(key.as_str()).unwrap();
        let again = converter.convert(&ExportedDocument::new(kind, key.clone(), live), &opts).unwrap();

        assert_eq!(again.to_payload(), original.to_payload());
    }
}

#[tokio::test]
async fn probe_returns_live_document() {
    let target = Environment::new().seed(ResourceKind::Model, "m1", fixtures::model("m1", "http://prod"));
    let gate = mig_core::ExistenceGate::new(Arc::new(target.registry()));

    match gate.probe(ResourceKind::Model, &ResourceKey::new("m1")).await {
        Presence::Present(doc) => assert_eq!(doc["endpoint"], json!("http://prod")),
        Presence::Absent => panic!("expected live document"),
    }
    assert!(!gate.exists(ResourceKind::Model, &ResourceKey::new("m2")).await);
}
