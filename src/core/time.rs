//! Timestamp and event-id helpers shared by the journal and JSON output.

use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Envelope printed by `--format json`: one object per job run, with the
/// job summary nested under `summary`.
pub fn job_envelope(job: &str, status: &str, summary: JsonValue) -> JsonValue {
    serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "job": job,
        "status": status,
        "summary": summary,
    })
}
