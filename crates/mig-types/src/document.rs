//! Export and import document shapes
//!
//! - [`ExportedDocument`]: what the source environment returned, untouched
//! - [`ImportDocument`]: the environment-agnostic payload written to the target
//!
//! An [`ImportDocument`] can only be produced through [`ImportDocumentBuilder`]
//! and is immutable afterwards; overrides return a new document.

use crate::kind::{ResourceKey, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object carrying resource fields
pub type Document = Map<String, Value>;

/// Resource as fetched from the source environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedDocument {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource key in the source environment
    pub key: ResourceKey,
    /// Raw fields
    pub fields: Document,
}

impl ExportedDocument {
    /// Create new exported document
    #[inline]
    #[must_use]
    pub fn new(kind: ResourceKind, key: impl Into<ResourceKey>, fields: Document) -> Self {
        Self {
            kind,
            key: key.into(),
            fields,
        }
    }

    /// Get a raw field
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a string field
    #[inline]
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Get an array field, empty when absent or not an array
    #[must_use]
    pub fn array_field(&self, name: &str) -> &[Value] {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}

/// Audit identity written explicitly into imported resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    /// User recorded as creator
    pub created_by: String,
    /// User recorded as last updater
    pub updated_by: String,
}

/// Target-ready payload for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDocument {
    kind: ResourceKind,
    fields: Document,
    audit: Option<Audit>,
}

impl ImportDocument {
    /// Start building a document for `kind`
    #[inline]
    #[must_use]
    pub fn builder(kind: ResourceKind) -> ImportDocumentBuilder {
        ImportDocumentBuilder {
            kind,
            fields: Document::new(),
            audit: None,
        }
    }

    /// Resource kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// All fields (audit excluded)
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Document {
        &self.fields
    }

    /// Get a field
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Look up a nested value by JSON pointer (`/connection/url`)
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let (head, rest) = split_pointer(pointer)?;
        let value = self.fields.get(head)?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.pointer(rest)
        }
    }

    /// Audit identity, when one was attached
    #[inline]
    #[must_use]
    pub fn audit(&self) -> Option<&Audit> {
        self.audit.as_ref()
    }

    /// Return a copy with `value` written at `pointer`
    ///
    /// Intermediate objects are created as needed. A `null` value removes the
    /// field instead, so absent optional fields stay absent.
    #[must_use]
    pub fn with_override(&self, pointer: &str, value: Value) -> Self {
        let mut next = self.clone();
        if let Some((head, rest)) = split_pointer(pointer) {
            if rest.is_empty() {
                if value.is_null() {
                    next.fields.remove(head);
                } else {
                    next.fields.insert(head.to_string(), value);
                }
            } else {
                let slot = next
                    .fields
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                set_nested(slot, rest, value);
            }
        }
        next
    }

    /// Render the JSON payload sent to the target environment
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut payload = self.fields.clone();
        if let Some(audit) = &self.audit {
            payload.insert("createdBy".to_string(), Value::String(audit.created_by.clone()));
            payload.insert("updatedBy".to_string(), Value::String(audit.updated_by.clone()));
        }
        Value::Object(payload)
    }
}

/// Builder for [`ImportDocument`]
#[derive(Debug, Clone)]
pub struct ImportDocumentBuilder {
    kind: ResourceKind,
    fields: Document,
    audit: Option<Audit>,
}

impl ImportDocumentBuilder {
    /// Set a required field
    #[inline]
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field only when it carries a non-null value
    #[must_use]
    pub fn optional_field<V: Into<Value>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value.map(Into::into) {
            if !value.is_null() {
                self.fields.insert(name.into(), value);
            }
        }
        self
    }

    /// Merge several fields, dropping nulls
    #[must_use]
    pub fn fields(mut self, fields: Document) -> Self {
        for (name, value) in fields {
            if !value.is_null() {
                self.fields.insert(name, value);
            }
        }
        self
    }

    /// Attach the audit identity
    #[inline]
    #[must_use]
    pub fn with_audit(mut self, created_by: impl Into<String>, updated_by: impl Into<String>) -> Self {
        self.audit = Some(Audit {
            created_by: created_by.into(),
            updated_by: updated_by.into(),
        });
        self
    }

    /// Check whether a field has been set
    #[inline]
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Finish the document
    #[inline]
    #[must_use]
    pub fn build(self) -> ImportDocument {
        ImportDocument {
            kind: self.kind,
            fields: self.fields,
            audit: self.audit,
        }
    }
}

fn split_pointer(pointer: &str) -> Option<(&str, &str)> {
    let body = pointer.strip_prefix('/')?;
    if body.is_empty() {
        return None;
    }
    match body.find('/') {
        Some(idx) => Some((&body[..idx], &body[idx..])),
        None => Some((body, "")),
    }
}

fn set_nested(slot: &mut Value, pointer: &str, value: Value) {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    let Some((head, rest)) = split_pointer(pointer) else {
        return;
    };
    let Value::Object(map) = slot else {
        return;
    };
    if rest.is_empty() {
        if value.is_null() {
            map.remove(head);
        } else {
            map.insert(head.to_string(), value);
        }
        return;
    }
    let child = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    set_nested(child, rest, value);
}
