use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-field dev/prod pair presented for human review
///
/// Read-only projection: building one never mutates either environment.
/// `prod_value` is `null` when the target has no value yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    /// Declared field name
    pub field_name: String,
    /// Value staged from the source environment
    pub dev_value: Value,
    /// Value live in (or chosen for) the target environment
    pub prod_value: Value,
}

impl FieldDiff {
    /// Create new diff
    #[inline]
    #[must_use]
    pub fn new(field_name: impl Into<String>, dev_value: Value, prod_value: Value) -> Self {
        Self {
            field_name: field_name.into(),
            dev_value,
            prod_value,
        }
    }

    /// Check if the environments disagree
    #[inline]
    #[must_use]
    pub fn differs(&self) -> bool {
        self.dev_value != self.prod_value
    }

    /// Replace the production value (reviewer decision)
    #[inline]
    #[must_use]
    pub fn with_prod_value(mut self, value: Value) -> Self {
        self.prod_value = value;
        self
    }
}
