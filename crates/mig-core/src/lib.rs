//! Migration Core - cross-environment resource migration
//!
//! Moves platform resources (projects, agent graphs and apps, tools,
//! prompts, models, ...) from a source environment to a target:
//! - Resolves lineage dependencies into an ordered plan
//! - Converts export documents into import documents
//! - Chooses import or update per entry and records every outcome
//! - Watches new deployments and prunes stale versions afterwards
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_core::prelude::*;
//!
//! # async fn example(source: ClientRegistry, target: ClientRegistry, lineage: Arc<dyn LineageClient>) -> Result<(), MigrationError> {
//! let engine = MigrationEngine::builder(EngineConfig::default())
//!     .source(source)
//!     .target(target)
//!     .lineage(lineage)
//!     .build()?;
//!
//! let report = engine.migrate(&MigrationRequest::new(ResourceKind::AgentApp, "app-1")).await;
//! println!("{}/{} migrated", report.result.succeeded_count(), report.plan.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod gate;
pub mod guarded;
pub mod reconciler;
pub mod records;
pub mod resolver;
pub mod staging;
pub mod state;

pub use client::{DeploymentClient, LineageClient, PolicyClient, ResourceClient};
pub use config::{EngineConfig, EnvironmentConfig, ReconcileConfig};
pub use engine::{
    EngineBuilder, MigrationEngine, MigrationReport, MigrationRequest, ResourceOverride, Review,
    StageReport,
};
pub use error::{ClientError, ErrorClass, MigrationError};
pub use executor::{EntryApplier, EntryFailure, EntryOutcome, MigrationExecutor, MigrationResult, WritePath};
pub use gate::{ExistenceGate, Presence};
pub use guarded::{ClientRegistry, GuardedClient};
pub use reconciler::{PostMigrationReconciler, ReconcileHandle, ReconcileOutcome};
pub use records::{InMemoryRecordStore, MigrationRecordStore};
pub use resolver::DependencyResolver;
pub use staging::{StagedDocument, StagingArea};
pub use state::{validate_transition, EntryPhase, IllegalTransition};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving migrations
    pub use crate::{
        ClientRegistry, DeploymentClient, EngineConfig, LineageClient, MigrationEngine, MigrationError,
        MigrationRequest, MigrationResult, PolicyClient, ResourceClient,
    };
    pub use mig_types::{LineageDirection, ResourceKey, ResourceKind, ResourceRef};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
