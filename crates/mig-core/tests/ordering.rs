//! Plan ordering properties over generated lineage graphs

use mig_core::DependencyResolver;
use mig_test_utils::StaticLineage;
use mig_types::{LineageDirection, MigrationPlan, ResourceKey, ResourceKind};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn kind() -> impl Strategy<Value = ResourceKind> {
    (0usize..ResourceKind::ALL.len()).prop_map(|i| ResourceKind::ALL[i])
}

/// Edges between nodes `n0..n{size}`; node 0 is the root
fn graph() -> impl Strategy<Value = (Vec<ResourceKind>, Vec<(usize, usize)>)> {
    (2usize..8).prop_flat_map(|size| {
        (
            prop::collection::vec(kind(), size),
            prop::collection::vec((0..size, 0..size), 0..20),
        )
    })
}

fn plan(kinds: &[ResourceKind], edges: &[(usize, usize)], depth: u32, direction: LineageDirection) -> MigrationPlan {
    let lineage = edges.iter().fold(StaticLineage::new(), |lineage, (from, to)| {
        lineage.uses(
            (kinds[*from], format!("n{from}").as_str()),
            (kinds[*to], format!("n{to}").as_str()),
        )
    });
    let resolver = DependencyResolver::new(Arc::new(lineage)).with_max_depth(depth);

    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(resolver.plan(&ResourceKey::new("n0"), kinds[0], direction))
}

proptest! {
    #[test]
    fn projects_always_come_first((kinds, edges) in graph(), depth in 1u32..5, downstream in any::<bool>()) {
        let direction = if downstream { LineageDirection::Downstream } else { LineageDirection::Upstream };
        let plan = plan(&kinds, &edges, depth, direction);

        let first_other = plan.iter().position(|e| !e.kind.is_project()).unwrap_or(plan.len());
        prop_assert!(plan.iter().skip(first_other).all(|e| !e.kind.is_project()));
    }

    #[test]
    fn every_resource_appears_once((kinds, edges) in graph(), depth in 1u32..5) {
        let plan = plan(&kinds, &edges, depth, LineageDirection::Upstream);

        let unique: HashSet<_> = plan.iter().map(|e| e.resource()).collect();
        prop_assert_eq!(unique.len(), plan.len());
        prop_assert!(plan.position(kinds[0], &ResourceKey::new("n0")).is_some());
    }

    #[test]
    fn upstream_root_follows_its_dependencies((kinds, edges) in graph()) {
        prop_assume!(!kinds[0].is_project());
        let plan = plan(&kinds, &edges, 3, LineageDirection::Upstream);

        let root = plan.position(kinds[0], &ResourceKey::new("n0")).unwrap();
        prop_assert_eq!(root, plan.len() - 1);
    }
}
