//! Source document → canonical document.

use crate::core::config::MigrateConfig;
use crate::core::store::Document;
use serde_json::Value;

/// Names of the structural fields the transformation treats specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub identity: String,
    pub classification: String,
    pub payload: String,
}

impl FieldNames {
    pub fn from_config(config: &MigrateConfig) -> Self {
        Self {
            identity: config.identity_field.clone(),
            classification: config.classification_field.clone(),
            payload: config.payload_field.clone(),
        }
    }
}

impl Default for FieldNames {
    fn default() -> Self {
        Self::from_config(&MigrateConfig::default())
    }
}

/// Build the canonical document for one source document.
///
/// Result starts with identity and classification, then every other root
/// field of the source, then (when `flatten` is set) payload fields whose
/// names are still free. Insertion never overwrites: the derived
/// classification beats a stale root field of the same name, and root fields
/// beat payload fields. A missing identity stays missing.
pub fn to_canonical(
    source: &Document,
    classification: &str,
    flatten: bool,
    fields: &FieldNames,
) -> Document {
    let mut out = Document::new();
    if let Some(id) = source.get(&fields.identity) {
        out.insert(fields.identity.clone(), id.clone());
    }
    out.insert(
        fields.classification.clone(),
        Value::String(classification.to_string()),
    );

    for (key, value) in source {
        if *key == fields.identity || *key == fields.payload {
            continue;
        }
        out.entry(key.clone()).or_insert_with(|| value.clone());
    }

    if flatten {
        if let Some(Value::Object(payload)) = source.get(&fields.payload) {
            for (key, value) in payload {
                out.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    out
}
