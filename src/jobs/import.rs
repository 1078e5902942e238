//! Seed a source collection from a JSON-lines export.
//!
//! Loading goes through the same identity-keyed path as consolidation, so
//! importing the same file twice leaves the collection unchanged.

use crate::core::config::validate_collection_name;
use crate::core::error::MigrateError;
use crate::core::loader::{LoadStats, load_document};
use crate::core::output;
use crate::core::store::InsertOutcome;
use crate::jobs::JobContext;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub collection: String,
    pub lines: u64,
    #[serde(flatten)]
    pub stats: LoadStats,
}

pub fn import_jsonl(
    ctx: &JobContext,
    collection: &str,
    file: &Path,
) -> Result<ImportSummary, MigrateError> {
    let cfg = ctx.config;
    validate_collection_name(collection)?;
    if cfg.excluded_names().iter().any(|n| n.eq_ignore_ascii_case(collection)) {
        return Err(MigrateError::ValidationError(format!(
            "{} is reserved and cannot be an import destination",
            collection
        )));
    }

    let reader = BufReader::new(File::open(file).map_err(MigrateError::IoError)?);
    ctx.store.create_collection(collection)?;

    let mut stats = LoadStats::default();
    let mut lines = 0u64;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(MigrateError::IoError)?;
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        let line_no = idx + 1;
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(doc)) => {
                let outcome = load_document(ctx.store, collection, &cfg.identity_field, &doc);
                if let InsertOutcome::Failed(detail) = &outcome {
                    if ctx.verbose {
                        output::warn(&format!("line {}: {}", line_no, detail));
                    }
                }
                stats.record(doc.get(&cfg.identity_field), outcome);
            }
            Ok(_) => stats.record(
                None,
                InsertOutcome::Failed(format!("line {}: not a JSON object", line_no)),
            ),
            Err(e) => stats.record(
                None,
                InsertOutcome::Failed(format!("line {}: {}", line_no, e)),
            ),
        }
    }

    let mut counters = vec![("imported", stats.migrated), ("skipped", stats.skipped)];
    if stats.failed > 0 {
        counters.push(("failed", stats.failed));
    }
    ctx.say(output::counters_line(collection, &counters));

    ctx.note(
        "import.load",
        collection,
        if stats.failed == 0 { "success" } else { "partial" },
        Some(serde_json::json!({
            "file": file.display().to_string(),
            "imported": stats.migrated,
            "skipped": stats.skipped,
            "failed": stats.failed,
        })),
    );

    Ok(ImportSummary {
        collection: collection.to_string(),
        lines,
        stats,
    })
}
