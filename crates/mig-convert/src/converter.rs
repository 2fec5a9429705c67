//! Export -> import shape conversion
//!
//! Pipeline per document:
//! 1. Strip audit fields and server identifiers
//! 2. Rename export names to import names
//! 3. Apply the kind's structural reshape
//! 4. Inject environment defaults (project id, policy)
//! 5. Check required fields and attach the audit identity
//!
//! Conversion is side-effect free and deterministic for identical input.

use crate::error::ConvertError;
use crate::options::ConversionOptions;
use crate::rules::{default_rules, ShapeRule, AUDIT_FIELDS, SERVER_ID_FIELDS};
use mig_types::{ExportedDocument, ImportDocument, ResourceKind};
use serde_json::Value;
use std::collections::HashMap;

/// Converts exported documents into import documents
#[derive(Debug)]
pub struct FormatConverter {
    rules: HashMap<ResourceKind, Box<dyn ShapeRule>>,
}

impl FormatConverter {
    /// Create converter with the built-in rules
    #[must_use]
    pub fn new() -> Self {
        let rules = default_rules().into_iter().map(|r| (r.kind(), r)).collect();
        Self { rules }
    }

    /// Replace the rule for one kind
    #[must_use]
    pub fn with_rule(mut self, rule: impl ShapeRule + 'static) -> Self {
        self.rules.insert(rule.kind(), Box::new(rule));
        self
    }

    /// Rule registered for a kind
    #[inline]
    #[must_use]
    pub fn rule(&self, kind: ResourceKind) -> Option<&dyn ShapeRule> {
        self.rules.get(&kind).map(|rule| &**rule)
    }

    /// Convert an exported document
    ///
    /// # Errors
    /// - `ConvertError::KindMismatch` if the registered rule is for another kind
    /// - `ConvertError::MissingField` if a required field is absent afterwards
    /// - any error raised by the kind's reshape step
    pub fn convert(
        &self,
        export: &ExportedDocument,
        opts: &ConversionOptions,
    ) -> Result<ImportDocument, ConvertError> {
        let rule = self
            .rules
            .get(&export.kind)
            .ok_or_else(|| ConvertError::invalid_shape("kind", format!("no rule for {}", export.kind)))?;

        if rule.kind() != export.kind {
            return Err(ConvertError::KindMismatch {
                expected: rule.kind(),
                actual: export.kind,
            });
        }

        let mut fields = export.fields.clone();

        for name in AUDIT_FIELDS
            .iter()
            .chain(SERVER_ID_FIELDS.iter())
            .chain(rule.server_fields().iter())
        {
            fields.remove(*name);
        }

        for (from, to) in rule.renames() {
            if let Some(value) = fields.remove(*from) {
                fields.insert((*to).to_string(), value);
            }
        }

        rule.reshape(export, &mut fields)?;

        if export.kind != ResourceKind::Project {
            if let Some(project_id) = &opts.project_id {
                fields.insert("projectId".to_string(), Value::from(project_id.as_str()));
            }
        }
        if let Some(policy) = &opts.policy {
            fields.insert("policy".to_string(), policy.clone());
        }

        for name in rule.required_fields(&fields) {
            match fields.get(name) {
                Some(value) if !value.is_null() => {}
                _ => return Err(ConvertError::missing(export.kind, name)),
            }
        }

        let mut builder = ImportDocument::builder(export.kind).fields(fields);
        if let Some(user) = &opts.audit_user {
            builder = builder.with_audit(user.as_str(), user.as_str());
        }

        tracing::debug!("Converted {} {} into import shape", export.kind, export.key);
        Ok(builder.build())
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new()
    }
}
