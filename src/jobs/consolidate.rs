//! Consolidation job: every source collection into the unified target.
//!
//! Sources are processed one after another, documents in cursor order. The
//! job has no checkpoint state; an interrupted run is recovered by running it
//! again, since already-loaded identities come back as `AlreadyExists`.

use crate::core::classify::{
    CollectionPlan, SourceCollection, SourceFormat, classify_collections,
};
use crate::core::error::MigrateError;
use crate::core::indexes::{IndexReport, build_indexes};
use crate::core::loader::{LoadStats, load_document, render_identity};
use crate::core::output;
use crate::core::store::{Document, InsertOutcome, UnreadableRow};
use crate::core::transform::{FieldNames, to_canonical};
use crate::jobs::JobContext;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub classification: String,
    pub format: SourceFormat,
    pub scanned: u64,
    #[serde(flatten)]
    pub stats: LoadStats,
    /// Set when the source could not be read to the end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationSummary {
    pub target: String,
    pub dry_run: bool,
    pub plan: CollectionPlan,
    pub sources: Vec<SourceReport>,
    pub indexes: Vec<IndexReport>,
    pub totals: LoadStats,
    pub total_documents: u64,
}

impl ConsolidationSummary {
    /// True when every document and index made it; duplicates do not count
    /// against a clean run.
    pub fn is_clean(&self) -> bool {
        self.totals.failed == 0
            && self.sources.iter().all(|s| s.error.is_none())
            && self.indexes.iter().all(|i| i.created)
    }
}

pub fn run_consolidation(
    ctx: &JobContext,
    dry_run: bool,
) -> Result<ConsolidationSummary, MigrateError> {
    let cfg = ctx.config;
    let names = ctx.store.list_collections()?;
    let plan = classify_collections(&names, &cfg.source_prefix, &cfg.excluded_names());

    if ctx.verbose {
        output::header(&format!("Migration to {}", cfg.target));
    }
    ctx.say(format!("Target collection: {}", cfg.target));
    ctx.say(format!(
        "{}* collections found: {}",
        cfg.source_prefix,
        plan.prefixed.len()
    ));
    ctx.say(format!("Raw collections found: {}", plan.raw.len()));
    ctx.say("");

    if dry_run {
        for source in plan.sources() {
            ctx.say(format!(
                "{} -> {}={} (flatten={})",
                source.name, cfg.classification_field, source.classification, source.flatten
            ));
        }
        for name in &plan.excluded {
            ctx.say(format!("{} (excluded)", name).dimmed().to_string());
        }
        let total_documents = if names.iter().any(|n| n.eq_ignore_ascii_case(&cfg.target)) {
            ctx.store.count_documents(&cfg.target)?
        } else {
            0
        };
        return Ok(ConsolidationSummary {
            target: cfg.target.clone(),
            dry_run: true,
            plan,
            sources: Vec::new(),
            indexes: Vec::new(),
            totals: LoadStats::default(),
            total_documents,
        });
    }

    ctx.store.create_collection(&cfg.target)?;

    let mut sources = Vec::with_capacity(plan.source_count());
    let mut totals = LoadStats::default();
    for source in plan.sources() {
        let report = migrate_collection(ctx, source);
        totals.absorb(&report.stats);
        sources.push(report);
    }

    ctx.say("");
    if ctx.verbose {
        output::header("Creating Indexes");
    }
    let indexes = build_indexes(ctx.store, &cfg.target, &cfg.indexes);
    for index in &indexes {
        match &index.error {
            None => {
                ctx.say(format!("Created index: {}", index.name));
                ctx.note(
                    "consolidate.index",
                    &cfg.target,
                    "success",
                    Some(serde_json::json!({"index": index.name})),
                );
            }
            Some(err) => {
                if ctx.verbose {
                    output::warn(&format!("index {} not created: {}", index.name, err));
                }
                ctx.note(
                    "consolidate.index",
                    &cfg.target,
                    "error",
                    Some(serde_json::json!({"index": index.name, "error": err})),
                );
            }
        }
    }

    let total_documents = ctx.store.count_documents(&cfg.target)?;
    ctx.say("");
    if ctx.verbose {
        output::header("Migration Complete");
    }
    ctx.say(format!(
        "Total documents in {}: {}",
        cfg.target, total_documents
    ));
    if totals.failed > 0 {
        ctx.say(
            format!("{} document(s) failed to migrate; see warnings above", totals.failed)
                .bright_yellow()
                .to_string(),
        );
    }

    Ok(ConsolidationSummary {
        target: cfg.target.clone(),
        dry_run: false,
        plan,
        sources,
        indexes,
        totals,
        total_documents,
    })
}

/// Transform and load one source collection. Per-document failures,
/// undecodable rows included, are counted and the scan goes on. A cursor
/// error ends this source only; it is reported and the job continues.
fn migrate_collection(
    ctx: &JobContext,
    source: &SourceCollection,
) -> SourceReport {
    let cfg = ctx.config;
    let fields = FieldNames::from_config(cfg);
    let mut stats = LoadStats::default();

    let scanned = ctx.store.scan(&source.name, &mut |row: Result<Document, UnreadableRow>| {
        let doc = match row {
            Ok(doc) => doc,
            Err(bad) => {
                if ctx.verbose {
                    output::warn(&format!(
                        "error migrating doc {}: {}",
                        bad.key, bad.detail
                    ));
                }
                stats.record_failure(bad.key, bad.detail);
                return;
            }
        };
        let canonical = to_canonical(&doc, &source.classification, source.flatten, &fields);
        let outcome = load_document(ctx.store, &cfg.target, &cfg.identity_field, &canonical);
        if let InsertOutcome::Failed(detail) = &outcome {
            if ctx.verbose {
                output::warn(&format!(
                    "error migrating doc {}: {}",
                    render_identity(canonical.get(&cfg.identity_field)),
                    detail
                ));
            }
        }
        stats.record(canonical.get(&cfg.identity_field), outcome);
    });

    let (scanned, error) = match scanned {
        Ok(n) => (n, None),
        Err(e) => {
            if ctx.verbose {
                output::warn(&format!("{}: scan aborted: {}", source.name, e));
            }
            (stats.migrated + stats.skipped + stats.failed, Some(e.to_string()))
        }
    };

    let mut counters = vec![("migrated", stats.migrated), ("skipped", stats.skipped)];
    if stats.failed > 0 {
        counters.push(("failed", stats.failed));
    }
    ctx.say(output::counters_line(&source.name, &counters));

    ctx.note(
        "consolidate.source",
        &source.name,
        if error.is_none() { "success" } else { "error" },
        Some(serde_json::json!({
            "classification": source.classification,
            "migrated": stats.migrated,
            "skipped": stats.skipped,
            "failed": stats.failed,
            "error": error,
        })),
    );

    SourceReport {
        name: source.name.clone(),
        classification: source.classification.clone(),
        format: source.format,
        scanned,
        stats,
        error,
    }
}
