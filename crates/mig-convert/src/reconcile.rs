//! Dev/prod field reconciliation
//!
//! Some fields legitimately differ between environments: endpoint URLs,
//! image references, per-environment identifiers. Each kind declares those
//! fields in a static [`FieldSpec`] table; only declared fields are compared.
//!
//! - [`FieldReconciler::diff`] builds the read-only review projection
//! - [`FieldReconciler::apply`] writes the chosen production values into a
//!   new [`ImportDocument`] before execution

use crate::rules::EXTERNAL_GRAPH_TARGET;
use mig_types::{Document, FieldDiff, ImportDocument, ResourceKind};
use serde_json::Value;

/// Reads a field out of a live (export-shaped) target document
pub type Extractor = fn(&Document) -> Option<Value>;

/// One environment-specific field of a resource kind
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name shown to reviewers
    pub name: &'static str,
    /// JSON pointer of the field in the import document
    pub import_pointer: &'static str,
    /// Extractor for the live target value
    pub live: Extractor,
}

impl FieldSpec {
    /// Value staged for import
    #[must_use]
    pub fn staged_value(&self, doc: &ImportDocument) -> Option<Value> {
        doc.pointer(self.import_pointer).filter(|v| !v.is_null()).cloned()
    }

    /// Value currently live at the target
    #[must_use]
    pub fn live_value(&self, live: &Document) -> Option<Value> {
        (self.live)(live).filter(|v| !v.is_null())
    }
}

fn at(doc: &Document, pointer: &str) -> Option<Value> {
    let body = pointer.strip_prefix('/')?;
    let (head, rest) = match body.find('/') {
        Some(idx) => (&body[..idx], &body[idx..]),
        None => (body, ""),
    };
    let value = doc.get(head)?;
    if rest.is_empty() {
        Some(value.clone())
    } else {
        value.pointer(rest).cloned()
    }
}

fn external_deployment_field(doc: &Document, name: &str) -> Option<Value> {
    doc.get("deployments")?
        .as_array()?
        .iter()
        .filter(|d| d.get("targetType").and_then(Value::as_str) == Some(EXTERNAL_GRAPH_TARGET))
        .max_by_key(|d| d.get("version").and_then(Value::as_u64).unwrap_or(0))
        .and_then(|d| d.get(name).cloned())
}

fn app_image_url(doc: &Document) -> Option<Value> {
    external_deployment_field(doc, "imageUrl")
}

fn app_model_list(doc: &Document) -> Option<Value> {
    external_deployment_field(doc, "modelList")
}

fn endpoint(doc: &Document) -> Option<Value> {
    at(doc, "/endpoint")
}

fn authorization_url(doc: &Document) -> Option<Value> {
    at(doc, "/authorization/url")
}

fn image_url(doc: &Document) -> Option<Value> {
    at(doc, "/imageUrl")
}

fn vector_db_url(doc: &Document) -> Option<Value> {
    at(doc, "/vectorDbConnection/url")
}

fn vector_db_collection(doc: &Document) -> Option<Value> {
    at(doc, "/vectorDbConnection/collection")
}

fn mcp_server_url(doc: &Document) -> Option<Value> {
    at(doc, "/serverUrl")
}

fn llm_endpoint(doc: &Document) -> Option<Value> {
    at(doc, "/llmEndpoint")
}

const AGENT_APP_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "imageUrl",
        import_pointer: "/imageUrl",
        live: app_image_url,
    },
    FieldSpec {
        name: "modelList",
        import_pointer: "/modelList",
        live: app_model_list,
    },
];

const TOOL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "endpoint",
        import_pointer: "/endpoint",
        live: endpoint,
    },
    FieldSpec {
        name: "authorization.url",
        import_pointer: "/authorization/url",
        live: authorization_url,
    },
];

const MODEL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "endpoint",
        import_pointer: "/endpoint",
        live: endpoint,
    },
    FieldSpec {
        name: "imageUrl",
        import_pointer: "/imageUrl",
        live: image_url,
    },
];

const VECTOR_DB_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "connection.url",
        import_pointer: "/connection/url",
        live: vector_db_url,
    },
    FieldSpec {
        name: "connection.collection",
        import_pointer: "/connection/collection",
        live: vector_db_collection,
    },
];

const MCP_CATALOG_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "url",
    import_pointer: "/url",
    live: mcp_server_url,
}];

const GUARDRAIL_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "llmEndpoint",
    import_pointer: "/llmEndpoint",
    live: llm_endpoint,
}];

/// Declared environment-specific fields of a kind
#[must_use]
pub fn field_specs(kind: ResourceKind) -> &'static [FieldSpec] {
    match kind {
        ResourceKind::AgentApp => AGENT_APP_FIELDS,
        ResourceKind::Tool => TOOL_FIELDS,
        ResourceKind::Model => MODEL_FIELDS,
        ResourceKind::VectorDb => VECTOR_DB_FIELDS,
        ResourceKind::McpCatalog => MCP_CATALOG_FIELDS,
        ResourceKind::Guardrail => GUARDRAIL_FIELDS,
        ResourceKind::Project
        | ResourceKind::AgentGraph
        | ResourceKind::Prompt
        | ResourceKind::FewShot => &[],
    }
}

/// Computes and applies dev/prod field pairs
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldReconciler;

impl FieldReconciler {
    /// Create reconciler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Diff a staged document against the live target value
    ///
    /// One entry per declared field present on either side. `live` is `None`
    /// when the resource does not exist at the target yet, in which case every
    /// `prod_value` is `null`.
    #[must_use]
    pub fn diff(&self, staged: &ImportDocument, live: Option<&Document>) -> Vec<FieldDiff> {
        field_specs(staged.kind())
            .iter()
            .filter_map(|spec| {
                let dev = spec.staged_value(staged);
                let prod = live.and_then(|doc| spec.live_value(doc));
                if dev.is_none() && prod.is_none() {
                    return None;
                }
                Some(FieldDiff::new(
                    spec.name,
                    dev.unwrap_or(Value::Null),
                    prod.unwrap_or(Value::Null),
                ))
            })
            .collect()
    }

    /// Write reviewed production values into a new document
    ///
    /// Diffs with a `null` production value keep the staged value. Names not
    /// declared for the document's kind are ignored.
    #[must_use]
    pub fn apply(&self, staged: &ImportDocument, resolved: &[FieldDiff]) -> ImportDocument {
        let specs = field_specs(staged.kind());
        resolved.iter().fold(staged.clone(), |doc, diff| {
            let Some(spec) = specs.iter().find(|s| s.name == diff.field_name) else {
                tracing::warn!(
                    "Ignoring undeclared field '{}' for {}",
                    diff.field_name,
                    staged.kind()
                );
                return doc;
            };
            if diff.prod_value.is_null() {
                doc
            } else {
                doc.with_override(spec.import_pointer, diff.prod_value.clone())
            }
        })
    }
}
