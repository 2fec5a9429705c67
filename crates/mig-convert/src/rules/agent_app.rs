//! Agent applications
//!
//! An application is "custom" when any of its deployments targets an
//! external graph image. Custom apps need the image settings of that
//! deployment and are created through a different endpoint downstream.

use super::ShapeRule;
use crate::error::ConvertError;
use mig_types::{Document, ExportedDocument, ResourceKind};
use serde_json::Value;

/// Deployment `targetType` marking a custom application
pub const EXTERNAL_GRAPH_TARGET: &str = "external_graph";

/// Fields carried over from the external deployment of a custom app
const CUSTOM_FIELDS: [&str; 4] = ["imageUrl", "modelList", "useExternalRegistry", "workersPerCore"];

/// Agent application flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppVariant {
    /// Runs a platform-managed agent graph
    Standard,
    /// Runs an externally built image
    Custom,
}

impl AppVariant {
    /// Value written to `appType`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AppVariant::Standard => "standard",
            AppVariant::Custom => "custom",
        }
    }

    /// Read the variant back from an import payload's `appType`
    #[must_use]
    pub fn from_app_type(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("custom") => AppVariant::Custom,
            _ => AppVariant::Standard,
        }
    }
}

fn is_external(deployment: &Value) -> bool {
    deployment.get("targetType").and_then(Value::as_str) == Some(EXTERNAL_GRAPH_TARGET)
}

/// Decide whether an exported app is custom or standard
#[must_use]
pub fn classify_app(export: &ExportedDocument) -> AppVariant {
    if export.array_field("deployments").iter().any(is_external) {
        AppVariant::Custom
    } else {
        AppVariant::Standard
    }
}

fn version_number(value: &Value) -> Option<u64> {
    value.get("version").and_then(Value::as_u64)
}

/// Highest-numbered version carrying the release flag
fn release_version(export: &ExportedDocument) -> Option<&Value> {
    export
        .array_field("versions")
        .iter()
        .filter(|v| v.get("release").and_then(Value::as_bool).unwrap_or(false))
        .max_by_key(|v| version_number(v).unwrap_or(0))
}

/// External deployment matching the release version, else the newest one
fn external_deployment(export: &ExportedDocument, release: u64) -> Option<&Value> {
    let externals: Vec<&Value> = export
        .array_field("deployments")
        .iter()
        .filter(|d| is_external(d))
        .collect();

    externals
        .iter()
        .find(|d| version_number(d) == Some(release))
        .or_else(|| externals.iter().max_by_key(|d| version_number(d).unwrap_or(0)))
        .copied()
}

/// Rule for [`ResourceKind::AgentApp`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentAppRule;

impl ShapeRule for AgentAppRule {
    fn kind(&self) -> ResourceKind {
        ResourceKind::AgentApp
    }

    fn server_fields(&self) -> &'static [&'static str] {
        &["appSeq", "appStatus", "endpoint", "servingUrl", "deployments", "versions"]
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        &[("appName", "name"), ("appDesc", "description")]
    }

    fn reshape(&self, export: &ExportedDocument, fields: &mut Document) -> Result<(), ConvertError> {
        let variant = classify_app(export);
        fields.insert("appType".to_string(), Value::from(variant.as_str()));

        let release = release_version(export).ok_or_else(|| ConvertError::NoReleaseVersion {
            key: export.key.clone(),
        })?;
        let number = version_number(release)
            .ok_or_else(|| ConvertError::invalid_shape("versions.version", "expected a number"))?;

        fields.insert("targetVersion".to_string(), Value::from(number));
        if let Some(graph) = release.get("graphUuid").filter(|v| !v.is_null()) {
            fields.insert("graphKey".to_string(), graph.clone());
        }
        if let Some(desc) = release.get("description").filter(|v| !v.is_null()) {
            fields.insert("versionDescription".to_string(), desc.clone());
        }

        if variant == AppVariant::Custom {
            if let Some(deployment) = external_deployment(export, number) {
                for name in CUSTOM_FIELDS {
                    if let Some(value) = deployment.get(name).filter(|v| !v.is_null()) {
                        fields.insert(name.to_string(), value.clone());
                    }
                }
            }
        }

        Ok(())
    }

    fn required_fields(&self, fields: &Document) -> Vec<&'static str> {
        let mut required = vec!["name", "appType", "targetVersion"];
        if AppVariant::from_app_type(fields.get("appType")) == AppVariant::Custom {
            required.extend(CUSTOM_FIELDS);
        }
        required
    }
}
