//! Document store abstraction for the migration jobs.
//!
//! The jobs never talk to a database engine directly. Everything they need
//! (collection listing, cursor iteration, identity-keyed inserts, index
//! creation, bulk field renames) goes through [`DocumentStore`], and the
//! store handle is passed explicitly into every job.

use crate::core::error::MigrateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schema-less document: an ordered mapping of field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Result of a single identity-keyed insert.
///
/// A duplicate identity is the normal outcome when a job is re-run, so it is
/// a variant of its own rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
    Failed(String),
}

/// A stored row whose body does not decode to a document.
///
/// `key` is the row's stored identity key. Reported through [`DocumentStore::scan`]
/// so the caller can count it and move on to the next row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableRow {
    pub key: String,
    pub detail: String,
}

/// Compound index definition: `keys` pairs a field with `1` (ascending) or
/// `-1` (descending), in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<(String, i8)>,
}

impl IndexSpec {
    pub fn new(name: &str, keys: &[(&str, i8)]) -> Self {
        Self {
            name: name.to_string(),
            keys: keys.iter().map(|(f, d)| (f.to_string(), *d)).collect(),
        }
    }
}

pub trait DocumentStore {
    /// All collection names, sorted. Engine-internal tables are not listed.
    fn list_collections(&self) -> Result<Vec<String>, MigrateError>;

    /// Create the collection if it does not exist yet.
    fn create_collection(&self, collection: &str) -> Result<(), MigrateError>;

    /// Visit every row of `collection` in cursor (insertion) order.
    /// Returns the number of rows visited.
    ///
    /// A row whose body cannot be decoded is handed to `visit` as an
    /// [`UnreadableRow`] and the scan continues. Only cursor and engine
    /// errors end the scan early.
    fn scan(
        &self,
        collection: &str,
        visit: &mut dyn FnMut(Result<Document, UnreadableRow>),
    ) -> Result<u64, MigrateError>;

    /// Insert `doc` keyed by `identity`; the key is unique per collection.
    fn insert_one(&self, collection: &str, identity: &Value, doc: &Document) -> InsertOutcome;

    fn count_documents(&self, collection: &str) -> Result<u64, MigrateError>;

    /// Count documents where `field` exists (a JSON `null` counts as present).
    fn count_with_field(&self, collection: &str, field: &str) -> Result<u64, MigrateError>;

    /// Create an index; re-creating an identical definition is a no-op.
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), MigrateError>;

    /// Rename `from` to `to` on every document carrying `from`, in one bulk
    /// update. Returns the number of modified documents.
    fn rename_field(&self, collection: &str, from: &str, to: &str) -> Result<u64, MigrateError>;

    /// Distinct values of `field` with their document counts, most frequent
    /// first. Documents missing the field are grouped under `Value::Null`.
    fn distinct_counts(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<Vec<(Value, u64)>, MigrateError>;

    /// First document (in cursor order) whose `field` equals `value`.
    fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, MigrateError>;
}
