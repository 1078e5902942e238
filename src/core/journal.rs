use crate::core::error;
use crate::core::schemas;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit journal of job steps, one JSON object per line.
///
/// Lives next to the database file so every run against the same database
/// accumulates in one place.
pub struct Journal {
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JournalEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub collection: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl Journal {
    pub fn for_database(db_path: &Path) -> Self {
        let mut name = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        name.push_str(schemas::JOURNAL_SUFFIX);
        Self {
            path: db_path.with_file_name(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(
        &self,
        op: &str,
        collection: &str,
        status: &str,
        detail: Option<serde_json::Value>,
    ) -> Result<(), error::MigrateError> {
        let ev = JournalEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: op.to_string(),
            collection: collection.to_string(),
            status: status.to_string(),
            detail,
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(error::MigrateError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(error::MigrateError::IoError)?;
        Ok(())
    }

    pub fn events(&self) -> Result<Vec<JournalEvent>, error::MigrateError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(error::MigrateError::IoError)?;
        let mut out = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            out.push(serde_json::from_str(line)?);
        }
        Ok(out)
    }
}
