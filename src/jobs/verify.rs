//! Post-migration inspection of the unified collection.

use crate::core::error::MigrateError;
use crate::core::store::Document;
use crate::jobs::JobContext;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationCount {
    pub classification: Value,
    pub documents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Document>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifySummary {
    pub target: String,
    pub total_documents: u64,
    pub classifications: Vec<ClassificationCount>,
    /// Documents still using the deprecated timestamp name.
    pub deprecated_timestamp: u64,
    /// Documents with no timestamp under the canonical name.
    pub missing_canonical_timestamp: u64,
}

pub fn verify_target(ctx: &JobContext, sample: bool) -> Result<VerifySummary, MigrateError> {
    let cfg = ctx.config;
    let total_documents = ctx.store.count_documents(&cfg.target)?;

    let mut classifications = Vec::new();
    for (value, documents) in ctx
        .store
        .distinct_counts(&cfg.target, &cfg.classification_field)?
    {
        let sample = if sample && !value.is_null() {
            ctx.store
                .find_one(&cfg.target, &cfg.classification_field, &value)?
        } else {
            None
        };
        classifications.push(ClassificationCount {
            classification: value,
            documents,
            sample,
        });
    }

    let deprecated_timestamp = ctx
        .store
        .count_with_field(&cfg.target, &cfg.deprecated_timestamp)?;
    let with_canonical = ctx
        .store
        .count_with_field(&cfg.target, &cfg.canonical_timestamp)?;

    let summary = VerifySummary {
        target: cfg.target.clone(),
        total_documents,
        classifications,
        deprecated_timestamp,
        missing_canonical_timestamp: total_documents.saturating_sub(with_canonical),
    };

    if ctx.verbose {
        print_summary(ctx, &summary);
    }
    Ok(summary)
}

fn print_summary(ctx: &JobContext, summary: &VerifySummary) {
    let cfg = ctx.config;
    crate::core::output::header(&format!("Verify {}", summary.target));
    ctx.say(format!("Total documents: {}", summary.total_documents));
    for entry in &summary.classifications {
        let label = match &entry.classification {
            Value::String(s) => s.clone(),
            Value::Null => format!("<no {}>", cfg.classification_field).red().to_string(),
            other => other.to_string(),
        };
        ctx.say(format!("  {}: {}", label.bright_cyan(), entry.documents));
        if let Some(doc) = &entry.sample {
            let rendered = serde_json::to_string(doc).unwrap_or_default();
            ctx.say(format!(
                "    {}",
                crate::core::output::compact_line(&rendered, 160).dimmed()
            ));
        }
    }
    ctx.say(format!(
        "Documents with {}: {}",
        cfg.deprecated_timestamp, summary.deprecated_timestamp
    ));
    ctx.say(format!(
        "Documents without {}: {}",
        cfg.canonical_timestamp, summary.missing_canonical_timestamp
    ));
}
