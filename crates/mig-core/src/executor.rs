//! Plan execution
//!
//! Walks a [`MigrationPlan`] strictly in order. For every entry:
//! 1. Probe the target through the [`ExistenceGate`]
//! 2. Call the applier's import or update path
//! 3. On success, bind the resource to the project policy (best effort)
//!
//! A failing entry is recorded and execution moves on; nothing is rolled
//! back and nothing is retried.

use crate::client::PolicyClient;
use crate::error::{ErrorClass, MigrationError};
use crate::gate::ExistenceGate;
use crate::state::{validate_transition, EntryPhase};
use async_trait::async_trait;
use mig_types::{Document, MigrationPlan, PlanEntry, ResourceKey, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Performs the actual write for one plan entry
#[async_trait]
pub trait EntryApplier: Send + Sync {
    /// Create the resource at the target
    async fn import(&self, entry: &PlanEntry) -> Result<Document, MigrationError>;

    /// Replace the resource at the target
    async fn update(&self, entry: &PlanEntry) -> Result<Document, MigrationError>;
}

/// Write path taken for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePath {
    /// Resource was absent, created
    Import,
    /// Resource existed, replaced
    Update,
}

/// Why an entry failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFailure {
    /// Error class
    pub class: ErrorClass,
    /// Rendered error
    pub message: String,
    /// Failure caused by a reference missing at the target
    pub missing_reference: bool,
}

impl From<&MigrationError> for EntryFailure {
    fn from(err: &MigrationError) -> Self {
        Self {
            class: err.class(),
            message: err.to_string(),
            missing_reference: err.is_missing_reference(),
        }
    }
}

/// Outcome of one plan entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryOutcome {
    /// Entry as executed, `is_update` filled in
    pub entry: PlanEntry,
    /// Final phase
    pub phase: EntryPhase,
    /// Write path taken
    pub path: WritePath,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<EntryFailure>,
    /// Target response for successful writes
    #[serde(skip)]
    pub response: Option<Document>,
    /// Wall time spent on the entry
    pub elapsed_ms: u64,
}

impl EntryOutcome {
    /// Entry was written
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.phase == EntryPhase::Succeeded
    }

    /// Resource reference
    #[inline]
    #[must_use]
    pub fn resource(&self) -> ResourceRef {
        self.entry.resource()
    }
}

/// Per-entry outcomes of one plan execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Outcomes in plan order
    pub outcomes: Vec<EntryOutcome>,
}

impl MigrationResult {
    /// Every entry succeeded
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(EntryOutcome::succeeded)
    }

    /// Every entry succeeded or failed only on a missing reference
    #[must_use]
    pub fn success_ignoring_missing_references(&self) -> bool {
        self.outcomes.iter().all(|o| {
            o.succeeded() || o.failure.as_ref().is_some_and(|f| f.missing_reference)
        })
    }

    /// Number of entries written
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    /// Number of entries that failed
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    /// Failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// Outcome for one resource
    #[must_use]
    pub fn outcome(&self, kind: ResourceKind, key: &ResourceKey) -> Option<&EntryOutcome> {
        self.outcomes.iter().find(|o| o.entry.kind == kind && &o.entry.key == key)
    }
}

/// Executes plans entry by entry
#[derive(Clone)]
pub struct MigrationExecutor {
    gate: ExistenceGate,
    policy: Option<Arc<dyn PolicyClient>>,
    project_seq: Option<i64>,
}

impl MigrationExecutor {
    /// Executor without policy binding
    #[inline]
    #[must_use]
    pub fn new(gate: ExistenceGate) -> Self {
        Self {
            gate,
            policy: None,
            project_seq: None,
        }
    }

    /// Bind every written resource to a project's policy
    ///
    /// Binding is skipped when `project_seq` is `None`.
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn PolicyClient>, project_seq: Option<i64>) -> Self {
        self.policy = Some(policy);
        self.project_seq = project_seq;
        self
    }

    /// Existence gate used for path selection
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &ExistenceGate {
        &self.gate
    }

    /// Execute every entry of `plan` in order
    pub async fn execute(&self, plan: &MigrationPlan, applier: &dyn EntryApplier) -> MigrationResult {
        let mut outcomes = Vec::with_capacity(plan.len());

        for (index, planned) in plan.iter().enumerate() {
            let outcome = self.execute_entry(planned, applier).await;
            match &outcome.failure {
                None => tracing::info!(
                    "[{}/{}] {} {:?} ok in {}ms",
                    index + 1,
                    plan.len(),
                    outcome.resource(),
                    outcome.path,
                    outcome.elapsed_ms
                ),
                Some(failure) => tracing::warn!(
                    "[{}/{}] {} {:?} failed: {}",
                    index + 1,
                    plan.len(),
                    outcome.resource(),
                    outcome.path,
                    failure.message
                ),
            }
            outcomes.push(outcome);
        }

        let result = MigrationResult { outcomes };
        tracing::info!(
            "Executed plan for {}: {}/{} succeeded",
            plan.root,
            result.succeeded_count(),
            result.outcomes.len()
        );
        result
    }

    async fn execute_entry(&self, planned: &PlanEntry, applier: &dyn EntryApplier) -> EntryOutcome {
        let start = Instant::now();
        let resource = planned.resource();
        let mut entry = planned.clone();

        let mut phase = advance(&resource, EntryPhase::Pending, EntryPhase::Probing);
        entry.is_update = self.gate.exists(entry.kind, &entry.key).await;

        let (path, result) = if entry.is_update {
            phase = advance(&resource, phase, EntryPhase::Updating);
            (WritePath::Update, applier.update(&entry).await)
        } else {
            phase = advance(&resource, phase, EntryPhase::Importing);
            (WritePath::Import, applier.import(&entry).await)
        };

        let (phase, failure, response) = match result {
            Ok(response) => {
                self.bind_policy(&resource).await;
                (advance(&resource, phase, EntryPhase::Succeeded), None, Some(response))
            }
            Err(err) => (
                advance(&resource, phase, EntryPhase::Failed),
                Some(EntryFailure::from(&err)),
                None,
            ),
        };

        EntryOutcome {
            entry,
            phase,
            path,
            failure,
            response,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    async fn bind_policy(&self, resource: &ResourceRef) {
        let (Some(policy), Some(project_seq)) = (&self.policy, self.project_seq) else {
            return;
        };
        let path = resource.policy_path();
        match policy.bind(&path, project_seq).await {
            Ok(()) => tracing::debug!("Bound {} to project {}", path, project_seq),
            Err(err) => tracing::warn!("Policy binding for {} failed: {}", path, err),
        }
    }
}

impl std::fmt::Debug for MigrationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationExecutor")
            .field("gate", &self.gate)
            .field("policy", &self.policy.is_some())
            .field("project_seq", &self.project_seq)
            .finish()
    }
}

fn advance(resource: &ResourceRef, from: EntryPhase, to: EntryPhase) -> EntryPhase {
    if let Err(err) = validate_transition(from, to) {
        tracing::error!("{}: {}", resource, err);
    }
    tracing::trace!("{}: {:?} -> {:?}", resource, from, to);
    to
}
