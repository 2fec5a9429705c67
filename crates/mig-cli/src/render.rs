//! Human readable output

use mig_core::{MigrationReport, ReconcileOutcome, Review, StageReport};
use mig_types::MigrationPlan;
use serde_json::Value;
use std::fmt::Write;

/// Numbered plan listing, root marked with `*`
pub(crate) fn plan(plan: &MigrationPlan) -> String {
    let mut out = format!("Plan for {} ({} entries)\n", plan.root, plan.len());
    for (i, entry) in plan.iter().enumerate() {
        let marker = if entry.resource() == plan.root { "*" } else { " " };
        let _ = writeln!(out, "{marker}{:>3}. {}", i + 1, entry.resource());
    }
    out
}

pub(crate) fn review(review: &Review) -> String {
    let state = if review.exists { "exists at target, will update" } else { "absent at target, will import" };
    let mut out = format!("{} ({state})\n", review.resource);
    if review.diffs.is_empty() {
        out.push_str("  no environment-specific fields\n");
    }
    for diff in &review.diffs {
        let marker = if diff.differs() { "~" } else { "=" };
        let _ = writeln!(
            out,
            "  {marker} {}: {} -> {}",
            diff.field_name,
            value(&diff.dev_value),
            value(&diff.prod_value)
        );
    }
    out
}

pub(crate) fn report(report: &MigrationReport) -> String {
    let result = &report.result;
    let mut out = format!(
        "Run {}: {}/{} entries migrated\n",
        report.run_id,
        result.succeeded_count(),
        result.outcomes.len()
    );
    for outcome in &result.outcomes {
        match &outcome.failure {
            None => {
                let _ = writeln!(out, "  ok   {} ({:?}, {}ms)", outcome.resource(), outcome.path, outcome.elapsed_ms);
            }
            Some(failure) => {
                let _ = writeln!(out, "  FAIL {} [{:?}] {}", outcome.resource(), failure.class, failure.message);
            }
        }
    }
    if !report.reconciliations.is_empty() {
        let _ = writeln!(out, "{} deployment watches started", report.reconciliations.len());
    }
    out
}

pub(crate) fn stage(report: &StageReport) -> String {
    let mut out = format!("Staged {} documents to {}\n", report.staged, report.path.display());
    for (resource, reason) in &report.skipped {
        let _ = writeln!(out, "  skipped {resource}: {reason}");
    }
    out
}

pub(crate) fn reconciliation(deployment_id: &str, outcome: &ReconcileOutcome) -> String {
    match outcome {
        ReconcileOutcome::Available { removed } if removed.is_empty() => {
            format!("Deployment {deployment_id} available")
        }
        ReconcileOutcome::Available { removed } => {
            format!("Deployment {deployment_id} available, removed {}", removed.join(", "))
        }
        ReconcileOutcome::Failed => format!("Deployment {deployment_id} failed, previous versions kept"),
        ReconcileOutcome::TimedOut => format!("Deployment {deployment_id} still pending, gave up waiting"),
        ReconcileOutcome::Cancelled => format!("Deployment {deployment_id} watch cancelled"),
    }
}

fn value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_types::{FieldDiff, ImportDocument, PlanEntry, ResourceKind, ResourceRef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plan_marks_root() {
        let root = ResourceRef::new(ResourceKind::AgentApp, "bot");
        let plan = MigrationPlan {
            root: root.clone(),
            entries: vec![PlanEntry::new(ResourceKind::Tool, "t1"), PlanEntry::from(root)],
        };

        assert_eq!(
            super::plan(&plan),
            "Plan for agent_app:bot (2 entries)\n   1. tool:t1\n*  2. agent_app:bot\n"
        );
    }

    #[test]
    fn review_lists_field_pairs() {
        let review = Review {
            resource: ResourceRef::new(ResourceKind::Tool, "t1"),
            exists: false,
            document: ImportDocument::builder(ResourceKind::Tool).build(),
            diffs: vec![
                FieldDiff::new("endpoint", json!("http://dev"), Value::Null),
                FieldDiff::new("authorization.url", json!("http://a"), json!("http://a")),
            ],
        };

        assert_eq!(
            super::review(&review),
            "tool:t1 (absent at target, will import)\n  ~ endpoint: http://dev -> -\n  = authorization.url: http://a -> http://a\n"
        );
    }

    #[test]
    fn reconciliation_lists_removed_versions() {
        let outcome = ReconcileOutcome::Available {
            removed: vec!["d-1".into(), "d-0".into()],
        };
        assert_eq!(reconciliation("d-2", &outcome), "Deployment d-2 available, removed d-1, d-0");
        assert_eq!(
            reconciliation("d-2", &ReconcileOutcome::Failed),
            "Deployment d-2 failed, previous versions kept"
        );
    }
}
