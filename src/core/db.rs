use crate::core::error;
use crate::core::schemas;
use crate::core::store::{Document, DocumentStore, IndexSpec, InsertOutcome, UnreadableRow};
use rusqlite::{Connection, ErrorCode, ffi, params};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::MigrateError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::MigrateError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::MigrateError::RusqliteError)?;
    Ok(conn)
}

/// Document store over a single SQLite file, one table per collection.
///
/// Writes go through one long-lived connection. Scans open their own read
/// connection so that inserts made while a cursor is open commit one by one
/// instead of piling up behind the reader.
pub struct SqliteDocumentStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteDocumentStore {
    pub fn open(db_path: &Path) -> Result<Self, error::MigrateError> {
        let conn = db_connect(&db_path.to_string_lossy())?;
        Ok(Self {
            path: db_path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_collection(&self, collection: &str) -> Result<bool, error::MigrateError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    fn require_collection(&self, collection: &str) -> Result<(), error::MigrateError> {
        if self.has_collection(collection)? {
            Ok(())
        } else {
            Err(error::MigrateError::NotFound(format!(
                "collection {}",
                collection
            )))
        }
    }
}

fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            code.code == ErrorCode::ConstraintViolation
                && (code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

/// Stored key for an identity. Whole-number floats collapse onto the
/// equal integer so `1` and `1.0` address the same document.
pub fn identity_key(identity: &Value) -> Result<String, error::MigrateError> {
    Ok(serde_json::to_string(&normalize_numbers(identity))?)
}

fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) if !n.is_i64() && !n.is_u64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Value::from(f as i64)
            }
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn parse_document(body: &str) -> Result<Document, error::MigrateError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(error::MigrateError::ValidationError(format!(
            "stored body is not a document: {}",
            other
        ))),
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn list_collections(&self) -> Result<Vec<String>, error::MigrateError> {
        let mut stmt = self.conn.prepare(schemas::LIST_COLLECTIONS_SQL)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn create_collection(&self, collection: &str) -> Result<(), error::MigrateError> {
        self.conn
            .execute(&schemas::collection_schema(collection), [])?;
        Ok(())
    }

    fn scan(
        &self,
        collection: &str,
        visit: &mut dyn FnMut(Result<Document, UnreadableRow>),
    ) -> Result<u64, error::MigrateError> {
        self.require_collection(collection)?;
        let reader = db_connect(&self.path.to_string_lossy())?;
        let mut stmt = reader.prepare(&schemas::select_rows(collection))?;
        let mut rows = stmt.query([])?;
        let mut seen = 0u64;
        while let Some(row) = rows.next()? {
            let key = match row.get_ref(0)?.as_str() {
                Ok(k) => k.to_string(),
                Err(_) => "<unreadable>".to_string(),
            };
            let decoded = match row.get_ref(1)?.as_str() {
                Ok(body) => parse_document(body).map_err(|e| e.to_string()),
                Err(e) => Err(format!("stored body is not text: {}", e)),
            };
            visit(decoded.map_err(|detail| UnreadableRow { key, detail }));
            seen += 1;
        }
        Ok(seen)
    }

    fn insert_one(&self, collection: &str, identity: &Value, doc: &Document) -> InsertOutcome {
        let key = match identity_key(identity) {
            Ok(k) => k,
            Err(e) => return InsertOutcome::Failed(e.to_string()),
        };
        let body = match serde_json::to_string(doc) {
            Ok(b) => b,
            Err(e) => return InsertOutcome::Failed(e.to_string()),
        };
        match self
            .conn
            .execute(&schemas::insert_document(collection), params![key, body])
        {
            Ok(_) => InsertOutcome::Inserted,
            Err(e) if is_duplicate_key(&e) => InsertOutcome::AlreadyExists,
            Err(e) => InsertOutcome::Failed(e.to_string()),
        }
    }

    fn count_documents(&self, collection: &str) -> Result<u64, error::MigrateError> {
        self.require_collection(collection)?;
        let n: i64 = self
            .conn
            .query_row(&schemas::count_all(collection), [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn count_with_field(&self, collection: &str, field: &str) -> Result<u64, error::MigrateError> {
        self.require_collection(collection)?;
        let path = schemas::json_path(field)?;
        let n: i64 = self.conn.query_row(
            &schemas::count_with_field(collection),
            params![path],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), error::MigrateError> {
        self.require_collection(collection)?;
        let sql = schemas::create_index(collection, spec)?;
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn rename_field(&self, collection: &str, from: &str, to: &str) -> Result<u64, error::MigrateError> {
        self.require_collection(collection)?;
        let from_path = schemas::json_path(from)?;
        let to_path = schemas::json_path(to)?;
        let changed = self.conn.execute(
            &schemas::rename_field(collection),
            params![from_path, to_path],
        )?;
        Ok(changed as u64)
    }

    fn distinct_counts(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<Vec<(Value, u64)>, error::MigrateError> {
        self.require_collection(collection)?;
        let path = schemas::json_path(field)?;
        let mut stmt = self.conn.prepare(&schemas::distinct_counts(collection))?;
        let rows = stmt.query_map(params![path], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for r in rows {
            let (raw, n) = r?;
            let value = match raw {
                Some(text) => serde_json::from_str(&text)?,
                None => Value::Null,
            };
            out.push((value, n as u64));
        }
        Ok(out)
    }

    fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, error::MigrateError> {
        self.require_collection(collection)?;
        let path = schemas::json_path(field)?;
        let wanted = serde_json::to_string(value)?;
        let mut stmt = self.conn.prepare(&schemas::find_one(collection))?;
        let mut rows = stmt.query(params![path, wanted])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let body: String = row.get(0)?;
        Ok(Some(parse_document(&body)?))
    }
}
