//! Error types for the migration engine
//!
//! Every collaborator failure is translated exactly once, at the client
//! boundary, into a [`MigrationError`]:
//! - `NotFound`: the addressed resource (or a reference it needs) is absent
//! - `SourceMissing`: the resource being migrated is absent at the source
//! - `Validation`: the source document could not be converted
//! - `ExternalService`: any other remote failure, with its HTTP status
//! - `Staging`: the file-backed staging area failed
//! - `Config`: the engine was wired or configured incorrectly
//!
//! Reconciliation timeouts are not errors; they surface as
//! [`ReconcileOutcome::TimedOut`](crate::ReconcileOutcome::TimedOut).

use mig_convert::ConvertError;
use mig_types::{ResourceKey, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP status signalling a uniqueness conflict
pub const CONFLICT_STATUS: u16 = 409;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Resource or one of its references is missing
    #[error("{kind} not found: {message}")]
    NotFound {
        /// Kind addressed by the failing call
        kind: ResourceKind,
        /// Key addressed by the failing call, if any
        key: Option<ResourceKey>,
        /// Remote message
        message: String,
    },

    /// Resource being migrated does not exist at the source
    #[error("{resource} not found at the source: {message}")]
    SourceMissing {
        /// Resource that was exported
        resource: ResourceRef,
        /// Remote message
        message: String,
    },

    /// Source document failed conversion
    #[error("validation failed: {0}")]
    Validation(#[from] ConvertError),

    /// Remote service failure other than not-found
    #[error("external service error (status {status:?}): {message}")]
    ExternalService {
        /// HTTP status, `None` for transport failures
        status: Option<u16>,
        /// Remote message
        message: String,
    },

    /// Staging file I/O failed
    #[error("staging error at {}: {source}", path.display())]
    Staging {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Staged file content is not a valid document list
    #[error("invalid staged document {}: {source}", path.display())]
    StagedFormat {
        /// File involved
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Engine misconfiguration
    #[error("configuration error: {0}")]
    Config(String),
}

impl MigrationError {
    /// Create a configuration error
    #[inline]
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Resource (or a reference) is missing, on either side
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, MigrationError::NotFound { .. } | MigrationError::SourceMissing { .. })
    }

    /// Re-tag a not-found raised while exporting `resource` from the source
    #[must_use]
    pub fn at_source(self, resource: &ResourceRef) -> Self {
        match self {
            MigrationError::NotFound { message, .. } => MigrationError::SourceMissing {
                resource: resource.clone(),
                message,
            },
            other => other,
        }
    }

    /// Remote rejected the write as a uniqueness conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            MigrationError::ExternalService {
                status: Some(CONFLICT_STATUS),
                ..
            }
        )
    }

    /// A write failed because something it references is absent at the target
    ///
    /// Callers may treat these as tolerable when the plan migrates the
    /// referenced resource in a later run. A resource missing at the source
    /// is never one.
    #[inline]
    #[must_use]
    pub fn is_missing_reference(&self) -> bool {
        matches!(self, MigrationError::NotFound { .. })
    }

    /// Transient failure worth retrying
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            MigrationError::ExternalService { status, .. } => match status {
                None => true,
                Some(code) => *code >= 500 || *code == 429,
            },
            _ => false,
        }
    }

    /// Serializable classification
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            MigrationError::NotFound { .. } | MigrationError::SourceMissing { .. } => ErrorClass::NotFound,
            MigrationError::Validation(_) => ErrorClass::Validation,
            MigrationError::ExternalService { .. } => ErrorClass::ExternalService,
            MigrationError::Staging { .. } | MigrationError::StagedFormat { .. } => ErrorClass::Staging,
            MigrationError::Config(_) => ErrorClass::Config,
        }
    }
}

/// Coarse error class carried in execution results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// See [`MigrationError::NotFound`]
    NotFound,
    /// See [`MigrationError::Validation`]
    Validation,
    /// See [`MigrationError::ExternalService`]
    ExternalService,
    /// See [`MigrationError::Staging`]
    Staging,
    /// See [`MigrationError::Config`]
    Config,
}

/// Raw failure reported by a collaborator client
///
/// Adapters return this; the engine never inspects it beyond the status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClientError {
    /// HTTP status, `None` when the request never got a response
    pub status: Option<u16>,
    /// Human readable message
    pub message: String,
}

impl ClientError {
    /// Error with an HTTP status
    #[inline]
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Transport failure without a response
    #[inline]
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// 404 response
    #[inline]
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(404, message)
    }

    /// Translate into the engine taxonomy
    #[must_use]
    pub fn classify(self, kind: ResourceKind, key: Option<&ResourceKey>) -> MigrationError {
        match self.status {
            Some(404) => MigrationError::NotFound {
                kind,
                key: key.cloned(),
                message: self.message,
            },
            status => MigrationError::ExternalService {
                status,
                message: self.message,
            },
        }
    }
}

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;
