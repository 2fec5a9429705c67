//! Few-shot example sets
//!
//! The export shape stores one row per question or answer:
//! `{sequence, type: "Q" | "A", content}`. The import shape wants paired
//! `{query, answer}` records ordered by sequence.

use super::ShapeRule;
use crate::error::ConvertError;
use mig_types::{Document, ExportedDocument, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One paired example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    /// Question half
    pub query: String,
    /// Answer half
    pub answer: String,
}

#[derive(Debug, Default)]
struct Halves {
    query: Option<String>,
    answer: Option<String>,
}

/// Group flat Q/A rows into pairs sorted by sequence
///
/// Sequences missing either half are dropped and logged. Rows without a
/// usable sequence, type or content are skipped the same way.
#[must_use]
pub fn group_examples(items: &[Value]) -> Vec<FewShotExample> {
    let mut by_sequence: BTreeMap<i64, Halves> = BTreeMap::new();

    for (idx, item) in items.iter().enumerate() {
        let sequence = item
            .get("sequence")
            .or_else(|| item.get("seq"))
            .and_then(Value::as_i64);
        let item_type = item.get("type").and_then(Value::as_str);
        let content = item.get("content").and_then(Value::as_str);

        let (Some(sequence), Some(item_type), Some(content)) = (sequence, item_type, content) else {
            tracing::warn!("Skipping malformed few-shot item at index {}", idx);
            continue;
        };

        let halves = by_sequence.entry(sequence).or_default();
        let slot = match item_type.trim().to_ascii_uppercase().as_str() {
            "Q" => &mut halves.query,
            "A" => &mut halves.answer,
            other => {
                tracing::warn!("Skipping few-shot item {} with unknown type '{}'", sequence, other);
                continue;
            }
        };

        if slot.is_some() {
            tracing::warn!("Duplicate {} half for few-shot sequence {}, keeping first", item_type, sequence);
            continue;
        }
        *slot = Some(content.to_string());
    }

    by_sequence
        .into_iter()
        .filter_map(|(sequence, halves)| match (halves.query, halves.answer) {
            (Some(query), Some(answer)) => Some(FewShotExample { query, answer }),
            (query, _) => {
                let missing = if query.is_none() { "query" } else { "answer" };
                tracing::warn!("Dropping few-shot sequence {}: missing {}", sequence, missing);
                None
            }
        })
        .collect()
}

/// Rule for [`ResourceKind::FewShot`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FewShotRule;

impl ShapeRule for FewShotRule {
    fn kind(&self) -> ResourceKind {
        ResourceKind::FewShot
    }

    fn server_fields(&self) -> &'static [&'static str] {
        &["fewShotSeq", "items"]
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        &[("fewShotName", "name"), ("fewShotDesc", "description")]
    }

    fn reshape(&self, export: &ExportedDocument, fields: &mut Document) -> Result<(), ConvertError> {
        if let Some(items) = export.get("items") {
            if !items.is_array() {
                return Err(ConvertError::invalid_shape("items", "expected an array"));
            }
        }
        let examples = group_examples(export.array_field("items"));
        let examples = serde_json::to_value(examples)
            .map_err(|e| ConvertError::invalid_shape("examples", e.to_string()))?;
        fields.insert("examples".to_string(), examples);
        Ok(())
    }

    fn required_fields(&self, _fields: &Document) -> Vec<&'static str> {
        vec!["name", "examples"]
    }
}
