//! Per-kind shape rules
//!
//! Each rule declares:
//! - which server-generated fields to strip (on top of the common set)
//! - how export names map onto import names
//! - an optional structural reshape step
//! - which import fields are required

mod agent_app;
mod agent_graph;
mod few_shot;

pub use agent_app::{classify_app, AgentAppRule, AppVariant, EXTERNAL_GRAPH_TARGET};
pub use agent_graph::AgentGraphRule;
pub use few_shot::{group_examples, FewShotExample, FewShotRule};

use crate::error::ConvertError;
use mig_types::{Document, ExportedDocument, ResourceKind};
use std::fmt::Debug;

/// Audit fields removed from every document
pub const AUDIT_FIELDS: [&str; 4] = ["createdBy", "createdAt", "updatedBy", "updatedAt"];

/// Server-assigned identifiers removed from every document
pub const SERVER_ID_FIELDS: [&str; 5] = ["id", "uuid", "seq", "projectSeq", "projectId"];

/// Conversion rule for one resource kind
pub trait ShapeRule: Send + Sync + Debug {
    /// Kind handled by this rule
    fn kind(&self) -> ResourceKind;

    /// Extra server-side fields to strip
    fn server_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Export name -> import name pairs
    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Structural reshape applied after stripping and renaming
    ///
    /// `export` is the untouched source document, so rules can read fields
    /// that were stripped from `fields`.
    fn reshape(&self, _export: &ExportedDocument, _fields: &mut Document) -> Result<(), ConvertError> {
        Ok(())
    }

    /// Fields that must be present in the final document
    fn required_fields(&self, fields: &Document) -> Vec<&'static str>;
}

/// Table-driven rule for kinds without structural reshaping
#[derive(Debug, Clone, Copy)]
pub struct TableRule {
    kind: ResourceKind,
    server_fields: &'static [&'static str],
    renames: &'static [(&'static str, &'static str)],
    required: &'static [&'static str],
}

impl TableRule {
    /// Create table rule
    #[inline]
    #[must_use]
    pub const fn new(
        kind: ResourceKind,
        server_fields: &'static [&'static str],
        renames: &'static [(&'static str, &'static str)],
        required: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            server_fields,
            renames,
            required,
        }
    }
}

impl ShapeRule for TableRule {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn server_fields(&self) -> &'static [&'static str] {
        self.server_fields
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        self.renames
    }

    fn required_fields(&self, _fields: &Document) -> Vec<&'static str> {
        self.required.to_vec()
    }
}

const PROJECT: TableRule = TableRule::new(
    ResourceKind::Project,
    &["memberCount", "ownerSeq"],
    &[("projectName", "name"), ("projectDesc", "description")],
    &["name"],
);

const TOOL: TableRule = TableRule::new(
    ResourceKind::Tool,
    &["toolSeq", "usageCount"],
    &[
        ("toolName", "name"),
        ("toolDesc", "description"),
        ("toolType", "type"),
        ("toolParams", "parameters"),
    ],
    &["name", "type"],
);

const PROMPT: TableRule = TableRule::new(
    ResourceKind::Prompt,
    &["promptSeq"],
    &[
        ("promptName", "name"),
        ("promptDesc", "description"),
        ("promptMsgs", "messages"),
        ("promptVariables", "variables"),
    ],
    &["name", "messages"],
);

const GUARDRAIL: TableRule = TableRule::new(
    ResourceKind::Guardrail,
    &["guardrailSeq"],
    &[
        ("guardrailName", "name"),
        ("guardrailDesc", "description"),
        ("guardrailRules", "rules"),
    ],
    &["name"],
);

const MODEL: TableRule = TableRule::new(
    ResourceKind::Model,
    &["servingSeq", "servingStatus"],
    &[
        ("servingName", "name"),
        ("servingDesc", "description"),
        ("modelName", "model"),
    ],
    &["name", "model"],
);

const VECTOR_DB: TableRule = TableRule::new(
    ResourceKind::VectorDb,
    &["vectorDbSeq", "status"],
    &[
        ("vectorDbName", "name"),
        ("vectorDbType", "type"),
        ("vectorDbConnection", "connection"),
    ],
    &["name", "type", "connection"],
);

const MCP_CATALOG: TableRule = TableRule::new(
    ResourceKind::McpCatalog,
    &["catalogSeq", "healthStatus"],
    &[
        ("catalogName", "name"),
        ("serverUrl", "url"),
        ("transportType", "transport"),
    ],
    &["name", "url"],
);

/// Built-in rules, one per resource kind
#[must_use]
pub fn default_rules() -> Vec<Box<dyn ShapeRule>> {
    vec![
        Box::new(PROJECT),
        Box::new(AgentGraphRule),
        Box::new(AgentAppRule),
        Box::new(TOOL),
        Box::new(PROMPT),
        Box::new(FewShotRule),
        Box::new(GUARDRAIL),
        Box::new(MODEL),
        Box::new(VECTOR_DB),
        Box::new(MCP_CATALOG),
    ]
}
