//! Lineage graph edges
//!
//! Lineage is recorded by the platform; the migration engine only reads it.

use crate::error::TypeError;
use crate::kind::{ResourceKey, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Relationship recorded on an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineageAction {
    /// Source references target
    Use,
    /// Source created target
    Create,
}

impl LineageAction {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LineageAction::Use => "USE",
            LineageAction::Create => "CREATE",
        }
    }
}

impl FromStr for LineageAction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USE" => Ok(LineageAction::Use),
            "CREATE" => Ok(LineageAction::Create),
            _ => Err(TypeError::UnknownAction(s.to_string())),
        }
    }
}

/// Walk direction through the lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageDirection {
    /// Towards what the resource depends on
    #[default]
    Upstream,
    /// Towards what depends on the resource
    Downstream,
}

impl LineageDirection {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LineageDirection::Upstream => "upstream",
            LineageDirection::Downstream => "downstream",
        }
    }
}

impl Display for LineageDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineageDirection {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upstream" | "up" => Ok(LineageDirection::Upstream),
            "downstream" | "down" => Ok(LineageDirection::Downstream),
            _ => Err(TypeError::UnknownDirection(s.to_string())),
        }
    }
}

/// One recorded edge of the lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    /// Key of the source node
    pub source_key: ResourceKey,
    /// Kind of the source node
    pub source_type: ResourceKind,
    /// Key of the target node
    pub target_key: ResourceKey,
    /// Kind of the target node
    pub target_type: ResourceKind,
    /// Relationship
    pub action: LineageAction,
    /// Distance from the queried node
    pub depth: u32,
}

impl LineageEdge {
    /// Source endpoint
    #[inline]
    #[must_use]
    pub fn source(&self) -> ResourceRef {
        ResourceRef::new(self.source_type, self.source_key.clone())
    }

    /// Target endpoint
    #[inline]
    #[must_use]
    pub fn target(&self) -> ResourceRef {
        ResourceRef::new(self.target_type, self.target_key.clone())
    }

    /// The endpoint reached when walking in `direction`
    ///
    /// Upstream walks follow source -> target (what the source uses),
    /// downstream walks follow target -> source (who uses the target).
    #[inline]
    #[must_use]
    pub fn far_end(&self, direction: LineageDirection) -> ResourceRef {
        match direction {
            LineageDirection::Upstream => self.target(),
            LineageDirection::Downstream => self.source(),
        }
    }
}
