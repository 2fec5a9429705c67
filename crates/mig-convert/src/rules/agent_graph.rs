use super::ShapeRule;
use crate::error::ConvertError;
use mig_types::{Document, ExportedDocument, ResourceKind};
use serde_json::Value;

/// Rule for [`ResourceKind::AgentGraph`]
///
/// The graph definition is carried verbatim; only its outline is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentGraphRule;

impl ShapeRule for AgentGraphRule {
    fn kind(&self) -> ResourceKind {
        ResourceKind::AgentGraph
    }

    fn server_fields(&self) -> &'static [&'static str] {
        &["graphSeq", "graphStatus", "lastRunAt"]
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("graphName", "name"),
            ("graphDesc", "description"),
            ("graphDefinition", "graph"),
        ]
    }

    fn reshape(&self, _export: &ExportedDocument, fields: &mut Document) -> Result<(), ConvertError> {
        let Some(graph) = fields.get("graph") else {
            return Ok(());
        };
        let Value::Object(graph) = graph else {
            return Err(ConvertError::invalid_shape("graph", "expected an object"));
        };
        match graph.get("nodes") {
            Some(Value::Array(_)) | None => Ok(()),
            Some(_) => Err(ConvertError::invalid_shape("graph.nodes", "expected an array")),
        }
    }

    fn required_fields(&self, _fields: &Document) -> Vec<&'static str> {
        vec!["name", "graph"]
    }
}
