//! Migration data model
//!
//! Shared vocabulary for the migration workspace:
//! - [`ResourceKind`] and [`ResourceKey`] identify a resource on the platform
//! - [`ExportedDocument`] / [`ImportDocument`] are the two shapes a resource takes
//! - [`LineageEdge`] describes who uses or creates whom
//! - [`MigrationPlan`] is the ordered work list for one migration request
//! - [`MigrationRecord`], [`FieldDiff`] and [`DeploymentWatch`] support bookkeeping,
//!   human review and post-migration reconciliation
//!
//! # Example
//!
//! ```rust
//! use mig_types::{ImportDocument, ResourceKind};
//!
//! let doc = ImportDocument::builder(ResourceKind::Prompt)
//!     .field("name", "greeting")
//!     .optional_field("description", None::<String>)
//!     .with_audit("alice", "alice")
//!     .build();
//!
//! assert!(doc.get("description").is_none());
//! assert_eq!(doc.audit().map(|a| a.created_by.as_str()), Some("alice"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod deployment;
mod diff;
mod document;
mod error;
mod kind;
mod lineage;
mod plan;
mod record;

pub use deployment::{
    DeploymentStatus, DeploymentVersion, DeploymentWatch, DEFAULT_MAX_WAIT_MS, DEFAULT_POLL_INTERVAL_MS,
};
pub use diff::FieldDiff;
pub use document::{Audit, Document, ExportedDocument, ImportDocument, ImportDocumentBuilder};
pub use error::TypeError;
pub use kind::{ResourceKey, ResourceKind, ResourceRef};
pub use lineage::{LineageAction, LineageDirection, LineageEdge};
pub use plan::{MigrationPlan, PlanEntry};
pub use record::MigrationRecord;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
