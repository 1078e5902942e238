//! Identity-keyed, idempotent loading into the target collection.

use crate::core::store::{Document, DocumentStore, InsertOutcome};
use serde::Serialize;
use serde_json::Value;

/// One document that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    /// Identity rendered as compact JSON, or `<missing>`.
    pub identity: String,
    pub detail: String,
}

/// Upper bound on failures kept with their detail; `failed` keeps counting
/// past it.
pub const MAX_RETAINED_FAILURES: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub migrated: u64,
    pub skipped: u64,
    pub failed: u64,
    /// The first [`MAX_RETAINED_FAILURES`] failures.
    pub failures: Vec<LoadFailure>,
}

impl LoadStats {
    pub fn record(&mut self, identity: Option<&Value>, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.migrated += 1,
            InsertOutcome::AlreadyExists => self.skipped += 1,
            InsertOutcome::Failed(detail) => self.record_failure(render_identity(identity), detail),
        }
    }

    /// Count a failure for a document known only by its rendered identity,
    /// such as a stored row that could not be decoded.
    pub fn record_failure(&mut self, identity: String, detail: String) {
        self.failed += 1;
        if self.failures.len() < MAX_RETAINED_FAILURES {
            self.failures.push(LoadFailure { identity, detail });
        }
    }

    pub fn absorb(&mut self, other: &LoadStats) {
        self.migrated += other.migrated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        let room = MAX_RETAINED_FAILURES.saturating_sub(self.failures.len());
        self.failures.extend(other.failures.iter().take(room).cloned());
    }
}

pub fn render_identity(identity: Option<&Value>) -> String {
    match identity {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| v.to_string()),
        None => "<missing>".to_string(),
    }
}

/// Insert one canonical document keyed by its identity field.
///
/// A document without an identity is refused: generating one would defeat
/// re-run deduplication.
pub fn load_document(
    store: &dyn DocumentStore,
    target: &str,
    identity_field: &str,
    doc: &Document,
) -> InsertOutcome {
    match doc.get(identity_field) {
        Some(id) => store.insert_one(target, id, doc),
        None => InsertOutcome::Failed(format!("document has no {} field", identity_field)),
    }
}
