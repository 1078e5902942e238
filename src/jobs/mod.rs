//! Batch jobs run against one document database.
//!
//! Each job receives a [`JobContext`] carrying the store handle, the
//! configuration and the audit journal. No job reaches for global state.

pub mod consolidate;
pub mod import;
pub mod rename;
pub mod verify;

use crate::core::config::MigrateConfig;
use crate::core::journal::Journal;
use crate::core::output;
use crate::core::store::DocumentStore;

pub struct JobContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub config: &'a MigrateConfig,
    pub journal: &'a Journal,
    /// Print human-readable progress while the job runs.
    pub verbose: bool,
}

impl<'a> JobContext<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        config: &'a MigrateConfig,
        journal: &'a Journal,
    ) -> Self {
        Self {
            store,
            config,
            journal,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Append a journal event. A journal that cannot be written is warned
    /// about and the job carries on.
    pub(crate) fn note(
        &self,
        op: &str,
        collection: &str,
        status: &str,
        detail: Option<serde_json::Value>,
    ) {
        if let Err(e) = self.journal.record(op, collection, status, detail) {
            output::warn(&format!(
                "journal {} not written for {}: {}",
                self.journal.path().display(),
                op,
                e
            ));
        }
    }

    pub(crate) fn say(&self, line: impl AsRef<str>) {
        if self.verbose {
            println!("{}", line.as_ref());
        }
    }
}
