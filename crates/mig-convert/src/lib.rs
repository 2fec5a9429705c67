//! Shape conversion for cross-environment migration
//!
//! - [`FormatConverter`]: export shape -> import shape, one [`ShapeRule`] per kind
//! - [`FieldReconciler`]: dev/prod pairs for environment-specific fields
//!
//! # Example
//!
//! ```rust
//! use mig_convert::{ConversionOptions, FormatConverter};
//! use mig_types::{ExportedDocument, ResourceKind};
//! use serde_json::json;
//!
//! let fields = json!({"promptName": "greet", "promptMsgs": [], "createdBy": "dev"});
//! let export = ExportedDocument::new(
//!     ResourceKind::Prompt,
//!     "p-1",
//!     fields.as_object().cloned().unwrap_or_default(),
//! );
//!
//! let doc = FormatConverter::new()
//!     .convert(&export, &ConversionOptions::new().with_project_id("prod"))
//!     .unwrap();
//! assert_eq!(doc.get("name"), Some(&json!("greet")));
//! assert!(doc.get("createdBy").is_none());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod converter;
mod error;
mod options;
mod reconcile;
pub mod rules;

pub use converter::FormatConverter;
pub use error::ConvertError;
pub use options::ConversionOptions;
pub use reconcile::{field_specs, Extractor, FieldReconciler, FieldSpec};
pub use rules::{classify_app, group_examples, AppVariant, FewShotExample, ShapeRule};
