//! Parse errors for the data model

/// Errors raised while parsing wire names into model types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Unknown resource kind
    #[error("unknown resource kind: '{0}'")]
    UnknownKind(String),

    /// Unknown lineage direction
    #[error("unknown lineage direction: '{0}'")]
    UnknownDirection(String),

    /// Unknown lineage action
    #[error("unknown lineage action: '{0}'")]
    UnknownAction(String),

    /// Empty resource key
    #[error("resource key must not be empty")]
    EmptyKey,
}
