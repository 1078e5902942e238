//! Field rename job: move the deprecated timestamp field to its canonical
//! name across the unified collection.
//!
//! Idempotent by construction: renamed documents no longer match the
//! deprecated-field filter, so a second run (or a run after an interrupted
//! one) only touches what is left.

use crate::core::error::MigrateError;
use crate::jobs::JobContext;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub collection: String,
    pub from: String,
    pub to: String,
    /// Documents carrying `from` before the update.
    pub before: u64,
    pub modified: u64,
    /// Documents carrying `to` after the update.
    pub after: u64,
    /// Documents still carrying `from` after the update.
    pub remaining: u64,
}

/// Rename the configured deprecated timestamp on the target collection.
pub fn rename_timestamp(ctx: &JobContext) -> Result<RenameReport, MigrateError> {
    let cfg = ctx.config;
    rename_field(
        ctx,
        &cfg.target,
        &cfg.deprecated_timestamp,
        &cfg.canonical_timestamp,
    )
}

pub fn rename_field(
    ctx: &JobContext,
    collection: &str,
    from: &str,
    to: &str,
) -> Result<RenameReport, MigrateError> {
    if ctx.verbose {
        crate::core::output::header(&format!("Renaming {} to {}", from, to));
    }

    let before = ctx.store.count_with_field(collection, from)?;
    ctx.say(format!("Documents with {}: {}", from, before));

    let modified = if before == 0 {
        ctx.say("No documents to migrate.");
        0
    } else {
        match ctx.store.rename_field(collection, from, to) {
            Ok(n) => {
                ctx.say(format!("Modified: {} documents", n));
                n
            }
            Err(e) => {
                ctx.note(
                    "rename.bulk",
                    collection,
                    "error",
                    Some(serde_json::json!({"from": from, "to": to, "error": e.to_string()})),
                );
                return Err(e);
            }
        }
    };

    let after = ctx.store.count_with_field(collection, to)?;
    let remaining = ctx.store.count_with_field(collection, from)?;
    ctx.say(format!("Documents with {}: {}", to, after));

    ctx.note(
        "rename.bulk",
        collection,
        "success",
        Some(serde_json::json!({
            "from": from,
            "to": to,
            "before": before,
            "modified": modified,
            "after": after,
        })),
    );

    if ctx.verbose {
        crate::core::output::header("Migration Complete");
    }

    Ok(RenameReport {
        collection: collection.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        before,
        modified,
        after,
        remaining,
    })
}
