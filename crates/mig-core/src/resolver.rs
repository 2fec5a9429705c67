//! Dependency resolution
//!
//! Walks the lineage graph breadth-first from a root resource and turns the
//! reachable set into an ordered [`MigrationPlan`]:
//! - project nodes always come first
//! - upstream walks put the root after the resources it depends on
//! - downstream walks put the root before its dependents
//!
//! A visited set guards against cycles; each resource appears once, at the
//! position of its first discovery.

use crate::client::LineageClient;
use indexmap::IndexSet;
use mig_types::{LineageAction, LineageDirection, MigrationPlan, PlanEntry, ResourceKey, ResourceKind, ResourceRef};
use std::sync::Arc;

/// Default number of lineage hops
pub const DEFAULT_MAX_DEPTH: u32 = 1;

/// Builds migration plans from lineage
#[derive(Clone)]
pub struct DependencyResolver {
    lineage: Arc<dyn LineageClient>,
    max_depth: u32,
    action: Option<LineageAction>,
}

impl DependencyResolver {
    /// Resolver walking one hop with no action filter
    #[inline]
    #[must_use]
    pub fn new(lineage: Arc<dyn LineageClient>) -> Self {
        Self {
            lineage,
            max_depth: DEFAULT_MAX_DEPTH,
            action: None,
        }
    }

    /// Set the number of hops to walk
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Only follow edges with this action
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: Option<LineageAction>) -> Self {
        self.action = action;
        self
    }

    /// Configured hop limit
    #[inline]
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Build the plan for `root_key`
    ///
    /// Never fails: when lineage for the root is unavailable the plan
    /// degrades to the root alone. Lineage failures deeper in the walk only
    /// prune that branch.
    pub async fn plan(&self, root_key: &ResourceKey, root_kind: ResourceKind, direction: LineageDirection) -> MigrationPlan {
        let root = ResourceRef::new(root_kind, root_key.clone());
        let mut seen: IndexSet<ResourceRef> = IndexSet::new();
        seen.insert(root.clone());

        let mut frontier = vec![root.clone()];
        for hop in 1..=self.max_depth {
            let mut next = Vec::new();
            for node in &frontier {
                let edges = match self
                    .lineage
                    .query(&node.key, node.kind, direction, self.action, 1)
                    .await
                {
                    Ok(edges) => edges,
                    Err(err) if *node == root => {
                        tracing::warn!("Lineage unavailable for {}, planning root only: {}", root, err);
                        return MigrationPlan::root_only(root);
                    }
                    Err(err) => {
                        tracing::warn!("Lineage unavailable for {} at hop {}: {}", node, hop, err);
                        continue;
                    }
                };

                for edge in edges {
                    if self.action.is_some_and(|action| action != edge.action) {
                        continue;
                    }
                    let far = edge.far_end(direction);
                    if seen.insert(far.clone()) {
                        next.push(far);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let plan = order(root, seen.into_iter().skip(1), direction);
        tracing::info!(
            "Planned {} entries for {} ({} walk, depth {})",
            plan.len(),
            plan.root,
            direction,
            self.max_depth
        );
        plan
    }
}

/// Arrange discovered resources around the root
fn order(root: ResourceRef, discovered: impl Iterator<Item = ResourceRef>, direction: LineageDirection) -> MigrationPlan {
    let (projects, others): (Vec<_>, Vec<_>) = discovered.partition(|r| r.kind.is_project());

    let mut ordered = Vec::with_capacity(projects.len() + others.len() + 1);
    if root.kind.is_project() {
        ordered.push(root.clone());
        ordered.extend(projects);
        ordered.extend(others);
    } else {
        ordered.extend(projects);
        match direction {
            LineageDirection::Upstream => {
                ordered.extend(others);
                ordered.push(root.clone());
            }
            LineageDirection::Downstream => {
                ordered.push(root.clone());
                ordered.extend(others);
            }
        }
    }

    MigrationPlan {
        root,
        entries: ordered.into_iter().map(PlanEntry::from).collect(),
    }
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("max_depth", &self.max_depth)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}
