//! Migration engine
//!
//! Orchestrates the full pipeline for one root resource:
//!
//! ```text
//! plan -> for each entry: export -> convert -> override -> gate -> import|update
//!      -> record -> schedule deployment reconciliation
//! ```
//!
//! The engine also exposes the individual steps (`export`, `prepare`,
//! `review`, `plan`) for interactive use, and a file-backed path
//! (`stage` then `import_staged`) for batch review.

use crate::client::{DeploymentClient, LineageClient, PolicyClient};
use crate::config::EngineConfig;
use crate::error::{MigrationError, Result};
use crate::executor::{EntryApplier, MigrationExecutor, MigrationResult};
use crate::gate::ExistenceGate;
use crate::guarded::ClientRegistry;
use crate::reconciler::{PostMigrationReconciler, ReconcileHandle};
use crate::records::{InMemoryRecordStore, MigrationRecordStore};
use crate::resolver::DependencyResolver;
use crate::staging::{StagedDocument, StagingArea};
use async_trait::async_trait;
use mig_convert::{FieldReconciler, FormatConverter};
use mig_types::{
    Document, ExportedDocument, FieldDiff, ImportDocument, LineageDirection, MigrationPlan, PlanEntry, ResourceKey,
    ResourceKind, ResourceRef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use ulid::Ulid;

/// Reviewed production values for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOverride {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource key
    pub key: ResourceKey,
    /// Resolved field pairs
    pub diffs: Vec<FieldDiff>,
}

/// One migration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    /// Resource the plan is built for
    pub root: ResourceRef,
    /// Walk direction, config default when `None`
    #[serde(default)]
    pub direction: Option<LineageDirection>,
    /// Migrate lineage dependencies too
    #[serde(default = "default_true")]
    pub include_dependencies: bool,
    /// Reviewed production values
    #[serde(default)]
    pub overrides: Vec<ResourceOverride>,
}

fn default_true() -> bool {
    true
}

impl MigrationRequest {
    /// Request for `root` with dependencies
    #[inline]
    #[must_use]
    pub fn new(kind: ResourceKind, key: impl Into<ResourceKey>) -> Self {
        Self {
            root: ResourceRef::new(kind, key),
            direction: None,
            include_dependencies: true,
            overrides: Vec::new(),
        }
    }

    /// Set the walk direction
    #[inline]
    #[must_use]
    pub fn with_direction(mut self, direction: LineageDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Migrate the root alone
    #[inline]
    #[must_use]
    pub fn without_dependencies(mut self) -> Self {
        self.include_dependencies = false;
        self
    }

    /// Add reviewed values for one resource
    #[inline]
    #[must_use]
    pub fn with_override(mut self, kind: ResourceKind, key: impl Into<ResourceKey>, diffs: Vec<FieldDiff>) -> Self {
        self.overrides.push(ResourceOverride {
            kind,
            key: key.into(),
            diffs,
        });
        self
    }
}

/// Read-only review of one resource before migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Resource reviewed
    pub resource: ResourceRef,
    /// Whether it already exists at the target
    pub exists: bool,
    /// Converted document as it would be written
    pub document: ImportDocument,
    /// Environment-specific field pairs
    pub diffs: Vec<FieldDiff>,
}

/// Outcome of a migration run
#[derive(Debug)]
pub struct MigrationReport {
    /// Run identifier used in logs
    pub run_id: Ulid,
    /// Executed plan
    pub plan: MigrationPlan,
    /// Per-entry outcomes
    pub result: MigrationResult,
    /// Background deployment reconciliations started by the run
    pub reconciliations: Vec<ReconcileHandle>,
}

impl MigrationReport {
    /// Every entry succeeded
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.result.success()
    }
}

/// Outcome of staging a plan to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    /// Merged file
    pub path: PathBuf,
    /// Entries written
    pub staged: usize,
    /// Entries that could not be prepared, with the reason
    pub skipped: Vec<(ResourceRef, String)>,
}

/// Builder for [`MigrationEngine`]
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    source: Option<ClientRegistry>,
    target: Option<ClientRegistry>,
    lineage: Option<Arc<dyn LineageClient>>,
    policy: Option<Arc<dyn PolicyClient>>,
    deployments: Option<Arc<dyn DeploymentClient>>,
    records: Option<Arc<dyn MigrationRecordStore>>,
    converter: Option<FormatConverter>,
}

impl EngineBuilder {
    /// Source environment clients
    #[inline]
    #[must_use]
    pub fn source(mut self, registry: ClientRegistry) -> Self {
        self.source = Some(registry);
        self
    }

    /// Target environment clients
    #[inline]
    #[must_use]
    pub fn target(mut self, registry: ClientRegistry) -> Self {
        self.target = Some(registry);
        self
    }

    /// Lineage service of the source environment
    #[inline]
    #[must_use]
    pub fn lineage(mut self, lineage: Arc<dyn LineageClient>) -> Self {
        self.lineage = Some(lineage);
        self
    }

    /// Policy service of the target environment
    #[inline]
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn PolicyClient>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Deployment service of the target environment
    #[inline]
    #[must_use]
    pub fn deployments(mut self, deployments: Arc<dyn DeploymentClient>) -> Self {
        self.deployments = Some(deployments);
        self
    }

    /// Record store, in-memory when unset
    #[inline]
    #[must_use]
    pub fn records(mut self, records: Arc<dyn MigrationRecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    /// Custom converter
    #[inline]
    #[must_use]
    pub fn converter(mut self, converter: FormatConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Assemble the engine
    ///
    /// # Errors
    /// `Config` if the configuration is invalid or the source, target or
    /// lineage collaborator is missing
    pub fn build(self) -> Result<MigrationEngine> {
        self.config.validate()?;
        let source = self.source.ok_or_else(|| MigrationError::config("source registry not set"))?;
        let target = self.target.ok_or_else(|| MigrationError::config("target registry not set"))?;
        let lineage = self.lineage.ok_or_else(|| MigrationError::config("lineage client not set"))?;

        let target = Arc::new(target);
        let resolver = DependencyResolver::new(lineage)
            .with_max_depth(self.config.lineage_depth)
            .with_action(self.config.lineage_action);

        let mut executor = MigrationExecutor::new(ExistenceGate::new(Arc::clone(&target)));
        if let Some(policy) = self.policy {
            executor = executor.with_policy(policy, self.config.project_seq);
        }

        let reconciler = self
            .deployments
            .filter(|_| self.config.reconcile.enabled)
            .map(|client| PostMigrationReconciler::new(client).with_retention(self.config.reconcile.retention));

        Ok(MigrationEngine {
            staging: StagingArea::new(self.config.staging_dir.clone()),
            source: Arc::new(source),
            target,
            resolver,
            converter: Arc::new(self.converter.unwrap_or_default()),
            fields: FieldReconciler::new(),
            executor,
            reconciler,
            records: self.records.unwrap_or_else(|| Arc::new(InMemoryRecordStore::new())),
            config: self.config,
        })
    }
}

/// Cross-environment migration engine
pub struct MigrationEngine {
    config: EngineConfig,
    source: Arc<ClientRegistry>,
    target: Arc<ClientRegistry>,
    resolver: DependencyResolver,
    converter: Arc<FormatConverter>,
    fields: FieldReconciler,
    executor: MigrationExecutor,
    reconciler: Option<PostMigrationReconciler>,
    records: Arc<dyn MigrationRecordStore>,
    staging: StagingArea,
}

impl MigrationEngine {
    /// Start building an engine
    #[inline]
    #[must_use]
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            ..EngineBuilder::default()
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Migration record store
    #[inline]
    #[must_use]
    pub fn records(&self) -> &Arc<dyn MigrationRecordStore> {
        &self.records
    }

    /// Staging area
    #[inline]
    #[must_use]
    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Fetch a resource from the source environment
    ///
    /// # Errors
    /// `SourceMissing` if the resource does not exist at the source
    pub async fn export(&self, kind: ResourceKind, key: &ResourceKey) -> Result<ExportedDocument> {
        let fields = self
            .source
            .client(kind)?
            .get(key)
            .await
            .map_err(|err| err.at_source(&ResourceRef::new(kind, key.clone())))?;
        Ok(ExportedDocument::new(kind, key.clone(), fields))
    }

    /// Export and convert a resource
    ///
    /// # Errors
    /// Export errors, or `Validation` if conversion fails
    pub async fn prepare(&self, kind: ResourceKind, key: &ResourceKey) -> Result<ImportDocument> {
        let export = self.export(kind, key).await?;
        Ok(self.converter.convert(&export, &self.config.conversion_options())?)
    }

    /// Prepare a resource and diff it against the target
    ///
    /// # Errors
    /// Same as [`MigrationEngine::prepare`]
    pub async fn review(&self, kind: ResourceKind, key: &ResourceKey) -> Result<Review> {
        let document = self.prepare(kind, key).await?;
        let presence = self.executor.gate().probe(kind, key).await;
        let diffs = self.fields.diff(&document, presence.document());

        tracing::info!(
            "Reviewed {}:{} ({} field pairs, {} differ)",
            kind,
            key,
            diffs.len(),
            diffs.iter().filter(|d| d.differs()).count()
        );
        Ok(Review {
            resource: ResourceRef::new(kind, key.clone()),
            exists: presence.exists(),
            document,
            diffs,
        })
    }

    /// Build the migration plan for a root resource
    pub async fn plan(&self, kind: ResourceKind, key: &ResourceKey, direction: Option<LineageDirection>) -> MigrationPlan {
        self.resolver
            .plan(key, kind, direction.unwrap_or(self.config.direction))
            .await
    }

    /// Plan and execute a migration
    ///
    /// Individual entry failures are reported in the result, never raised.
    pub async fn migrate(&self, request: &MigrationRequest) -> MigrationReport {
        let run_id = Ulid::new();
        let span = tracing::info_span!("migration", run = %run_id, root = %request.root);

        async {
            let plan = if request.include_dependencies {
                self.plan(request.root.kind, &request.root.key, request.direction).await
            } else {
                MigrationPlan::root_only(request.root.clone())
            };
            tracing::info!("Migrating {} with {} entries", request.root, plan.len());

            let applier = PipelineApplier {
                engine: self,
                overrides: &request.overrides,
            };
            let result = self.executor.execute(&plan, &applier).await;
            self.finish(run_id, plan, result).await
        }
        .instrument(span)
        .await
    }

    /// Prepare every entry of a plan and write it to the staging area
    ///
    /// Entries that fail to prepare are skipped and listed in the report.
    ///
    /// # Errors
    /// `Staging` if the files cannot be written
    pub async fn stage(&self, kind: ResourceKind, key: &ResourceKey, direction: Option<LineageDirection>) -> Result<StageReport> {
        let plan = self.plan(kind, key, direction).await;
        let project = self.config.staging_project();
        self.staging.clear(project, &plan.root).await?;

        let mut staged = 0;
        let mut skipped = Vec::new();
        for entry in plan.iter() {
            match self.prepare(entry.kind, &entry.key).await {
                Ok(document) => {
                    let doc = StagedDocument::new(entry.key.clone(), document);
                    self.staging.stage(project, &plan.root, staged, &doc).await?;
                    staged += 1;
                }
                Err(err) => {
                    tracing::warn!("Skipping {} while staging: {}", entry.resource(), err);
                    skipped.push((entry.resource(), err.to_string()));
                }
            }
        }

        let path = self.staging.merge(project, &plan.root).await?;
        Ok(StageReport { path, staged, skipped })
    }

    /// Import a merged staging file top to bottom
    ///
    /// # Errors
    /// `Staging`/`StagedFormat` if the file cannot be read, `Config` if it
    /// holds no documents
    pub async fn import_staged(&self, path: &Path) -> Result<MigrationReport> {
        let docs = self.staging.load(path).await?;
        let root = docs
            .last()
            .map(StagedDocument::resource)
            .ok_or_else(|| MigrationError::config(format!("{} holds no documents", path.display())))?;

        let run_id = Ulid::new();
        let span = tracing::info_span!("import_staged", run = %run_id, file = %path.display());

        async {
            let plan = MigrationPlan {
                root,
                entries: docs.iter().map(|d| PlanEntry::from(d.resource())).collect(),
            };
            tracing::info!("Importing {} staged documents", plan.len());

            let applier = StagedApplier {
                target: &self.target,
                docs: docs.iter().map(|d| (d.resource(), &d.document)).collect(),
            };
            let result = self.executor.execute(&plan, &applier).await;
            Ok(self.finish(run_id, plan, result).await)
        }
        .instrument(span)
        .await
    }

    /// Record successes and start deployment reconciliation
    async fn finish(&self, run_id: Ulid, plan: MigrationPlan, result: MigrationResult) -> MigrationReport {
        let mut reconciliations = Vec::new();

        for outcome in result.outcomes.iter().filter(|o| o.succeeded()) {
            let entry = &outcome.entry;
            if let Err(err) = self.records.record_migrated(&entry.key, entry.kind).await {
                tracing::warn!("Failed to record migration of {}: {}", entry.resource(), err);
            }

            let deployment = outcome.response.as_ref().and_then(deployment_id);
            if let (Some(reconciler), Some(deployment_id)) = (&self.reconciler, deployment) {
                let watch = self.config.watch_for(deployment_id);
                reconciliations.push(reconciler.spawn(entry.key.clone(), watch));
            }
        }

        tracing::info!(
            "Run {} finished: {}/{} entries migrated, {} deployments watched",
            run_id,
            result.succeeded_count(),
            result.outcomes.len(),
            reconciliations.len()
        );
        MigrationReport {
            run_id,
            plan,
            result,
            reconciliations,
        }
    }
}

impl std::fmt::Debug for MigrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Deployment id carried by a write response
fn deployment_id(response: &Document) -> Option<String> {
    response
        .get("deploymentId")
        .or_else(|| response.get("deployment").and_then(|d| d.get("id")))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Exports, converts and writes live source documents
struct PipelineApplier<'a> {
    engine: &'a MigrationEngine,
    overrides: &'a [ResourceOverride],
}

impl PipelineApplier<'_> {
    async fn document(&self, entry: &PlanEntry) -> Result<ImportDocument> {
        let prepared = self.engine.prepare(entry.kind, &entry.key).await?;
        let reviewed = self
            .overrides
            .iter()
            .filter(|o| o.kind == entry.kind && o.key == entry.key)
            .fold(prepared, |doc, o| self.engine.fields.apply(&doc, &o.diffs));
        Ok(reviewed)
    }
}

#[async_trait]
impl EntryApplier for PipelineApplier<'_> {
    async fn import(&self, entry: &PlanEntry) -> Result<Document> {
        let doc = self.document(entry).await?;
        self.engine.target.client(entry.kind)?.import(&entry.key, &doc).await
    }

    async fn update(&self, entry: &PlanEntry) -> Result<Document> {
        let doc = self.document(entry).await?;
        self.engine.target.client(entry.kind)?.update(&entry.key, &doc).await
    }
}

/// Writes documents read from a staging file
struct StagedApplier<'a> {
    target: &'a ClientRegistry,
    docs: HashMap<ResourceRef, &'a ImportDocument>,
}

impl StagedApplier<'_> {
    fn document(&self, entry: &PlanEntry) -> Result<&ImportDocument> {
        self.docs
            .get(&entry.resource())
            .copied()
            .ok_or_else(|| MigrationError::config(format!("{} missing from staged file", entry.resource())))
    }
}

#[async_trait]
impl EntryApplier for StagedApplier<'_> {
    async fn import(&self, entry: &PlanEntry) -> Result<Document> {
        let doc = self.document(entry)?;
        self.target.client(entry.kind)?.import(&entry.key, doc).await
    }

    async fn update(&self, entry: &PlanEntry) -> Result<Document> {
        let doc = self.document(entry)?;
        self.target.client(entry.kind)?.update(&entry.key, doc).await
    }
}
