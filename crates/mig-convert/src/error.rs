//! Conversion errors
//!
//! A conversion error is fatal for the resource being converted and for
//! nothing else; the executor records it against the entry and moves on.

use mig_types::{ResourceKey, ResourceKind};

/// Errors raised while turning an export document into an import document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// A required import field is structurally absent after conversion
    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        /// Kind being converted
        kind: ResourceKind,
        /// Missing field name
        field: String,
    },

    /// No version carries the release flag
    #[error("no release-flagged version found for {key}")]
    NoReleaseVersion {
        /// Resource key
        key: ResourceKey,
    },

    /// A field exists but has the wrong structure
    #[error("invalid shape for '{field}': {reason}")]
    InvalidShape {
        /// Field name
        field: String,
        /// What was wrong
        reason: String,
    },

    /// Document handed to a rule for another kind
    #[error("kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        /// Kind the rule handles
        expected: ResourceKind,
        /// Kind of the document
        actual: ResourceKind,
    },
}

impl ConvertError {
    /// Create missing-field error
    pub fn missing(kind: ResourceKind, field: impl Into<String>) -> Self {
        Self::MissingField {
            kind,
            field: field.into(),
        }
    }

    /// Create invalid-shape error
    pub fn invalid_shape(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
