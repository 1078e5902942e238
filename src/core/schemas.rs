//! SQL definitions backing the SQLite document store.
//!
//! Each collection is one table. `id` holds the compact JSON text of the
//! document identity (so `1` and `"1"` stay distinct keys) and `body` holds
//! the whole document as JSON. The implicit rowid gives cursor order.

use crate::core::error::MigrateError;
use crate::core::store::IndexSpec;

pub const LIST_COLLECTIONS_SQL: &str = "
    SELECT name FROM sqlite_master
    WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
    ORDER BY name
";

/// Suffix of the audit journal written next to the database file.
pub const JOURNAL_SUFFIX: &str = ".migrate.events.jsonl";

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// JSON path selecting a top-level field, e.g. `$."serverTimestamp"`.
pub fn json_path(field: &str) -> Result<String, MigrateError> {
    if field.is_empty() || field.contains('"') || field.contains('\\') {
        return Err(MigrateError::InvalidName(format!(
            "field name cannot be used as a JSON path: {:?}",
            field
        )));
    }
    Ok(format!("$.\"{}\"", field))
}

pub fn collection_schema(collection: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL
        )",
        quote_ident(collection)
    )
}

pub fn select_rows(collection: &str) -> String {
    format!("SELECT id, body FROM {} ORDER BY rowid", quote_ident(collection))
}

pub fn insert_document(collection: &str) -> String {
    format!(
        "INSERT INTO {}(id, body) VALUES(?1, ?2)",
        quote_ident(collection)
    )
}

pub fn count_all(collection: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(collection))
}

/// `?1` is the JSON path of the field.
pub fn count_with_field(collection: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE json_type(body, ?1) IS NOT NULL",
        quote_ident(collection)
    )
}

/// `?1` is the deprecated path, `?2` the canonical path. The value moves
/// through `json()` so objects, arrays and booleans keep their JSON type.
pub fn rename_field(collection: &str) -> String {
    format!(
        "UPDATE {} SET body = json_set(json_remove(body, ?1), ?2, json(body -> ?1))
         WHERE json_type(body, ?1) IS NOT NULL",
        quote_ident(collection)
    )
}

/// `?1` is the JSON path of the field.
pub fn distinct_counts(collection: &str) -> String {
    format!(
        "SELECT body -> ?1 AS v, COUNT(*) AS n FROM {}
         GROUP BY v ORDER BY n DESC, v",
        quote_ident(collection)
    )
}

/// `?1` is the JSON path, `?2` the compact JSON text of the wanted value.
pub fn find_one(collection: &str) -> String {
    format!(
        "SELECT body FROM {} WHERE body -> ?1 = ?2 ORDER BY rowid LIMIT 1",
        quote_ident(collection)
    )
}

/// Expression index over `json_extract` of each key, in key order.
pub fn create_index(collection: &str, spec: &IndexSpec) -> Result<String, MigrateError> {
    if spec.keys.is_empty() {
        return Err(MigrateError::ValidationError(format!(
            "index {} has no keys",
            spec.name
        )));
    }
    let mut columns = Vec::with_capacity(spec.keys.len());
    for (field, direction) in &spec.keys {
        let order = match direction {
            1 => "ASC",
            -1 => "DESC",
            other => {
                return Err(MigrateError::ValidationError(format!(
                    "index {}: direction for {} must be 1 or -1, got {}",
                    spec.name, field, other
                )));
            }
        };
        columns.push(format!(
            "json_extract(body, {}) {}",
            quote_literal(&json_path(field)?),
            order
        ));
    }
    Ok(format!(
        "CREATE INDEX IF NOT EXISTS {} ON {}({})",
        quote_ident(&spec.name),
        quote_ident(collection),
        columns.join(", ")
    ))
}
