use logdata_migrate::core::db::{self, SqliteDocumentStore};
use logdata_migrate::core::error::MigrateError;
use logdata_migrate::core::store::{Document, DocumentStore, IndexSpec, InsertOutcome};
use rusqlite::params;
use serde_json::{Value, json};
use tempfile::tempdir;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("test document must be an object"),
    }
}

fn insert(store: &SqliteDocumentStore, collection: &str, value: Value) -> InsertOutcome {
    let d = doc(value);
    let id = d.get("_id").cloned().expect("test doc has _id");
    store.insert_one(collection, &id, &d)
}

fn index_names(store: &SqliteDocumentStore, table: &str) -> Vec<String> {
    let conn = db::db_connect(&store.path().to_string_lossy()).expect("db connect");
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL ORDER BY name")
        .expect("prepare");
    stmt.query_map(params![table], |row| row.get::<_, String>(0))
        .expect("query")
        .map(|r| r.expect("row"))
        .collect()
}

#[test]
fn insert_one_distinguishes_inserted_duplicate_and_failure() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logdata").expect("create");

    assert_eq!(
        insert(&store, "logdata", json!({"_id": 1, "game": "mhs"})),
        InsertOutcome::Inserted
    );
    assert_eq!(
        insert(&store, "logdata", json!({"_id": 1, "game": "other"})),
        InsertOutcome::AlreadyExists
    );
    // Identity keys are typed: the string "1" is a different identity.
    assert_eq!(
        insert(&store, "logdata", json!({"_id": "1", "game": "mhs"})),
        InsertOutcome::Inserted
    );
    match insert(&store, "missing_table", json!({"_id": 2})) {
        InsertOutcome::Failed(detail) => assert!(detail.contains("no such table"), "{detail}"),
        other => panic!("expected failure, got {other:?}"),
    }

    assert_eq!(store.count_documents("logdata").expect("count"), 2);
    let first = store
        .find_one("logdata", "_id", &json!(1))
        .expect("find")
        .expect("present");
    assert_eq!(first["game"], json!("mhs"), "first insert must win");
}

#[test]
fn list_collections_is_sorted_and_hides_sqlite_tables() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    for name in ["logs_wildfire", "api_stats", "system.profile", "logs_mhs"] {
        store.create_collection(name).expect("create");
    }
    let conn = db::db_connect(&store.path().to_string_lossy()).expect("db connect");
    conn.execute(
        "CREATE TABLE seq(id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT)",
        [],
    )
    .expect("autoincrement table creates sqlite_sequence");

    let names = store.list_collections().expect("list");
    assert_eq!(
        names,
        vec!["api_stats", "logs_mhs", "logs_wildfire", "seq", "system.profile"]
    );
}

#[test]
fn scan_yields_documents_in_insertion_order_while_writes_proceed() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("src").expect("create");
    store.create_collection("dst").expect("create");
    for id in [30, 10, 20] {
        insert(&store, "src", json!({"_id": id, "n": id}));
    }

    let mut seen = Vec::new();
    let visited = store
        .scan("src", &mut |d| {
            let d = d.expect("readable row");
            let id = d["_id"].clone();
            assert_eq!(store.insert_one("dst", &id, &d), InsertOutcome::Inserted);
            seen.push(id);
        })
        .expect("scan");

    assert_eq!(visited, 3);
    assert_eq!(seen, vec![json!(30), json!(10), json!(20)]);
    assert_eq!(store.count_documents("dst").expect("count"), 3);
}

#[test]
fn scan_of_missing_collection_is_not_found() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    let err = store.scan("nope", &mut |_| {}).expect_err("missing collection");
    assert!(matches!(err, MigrateError::NotFound(_)), "{err}");
}

#[test]
fn scan_reports_undecodable_rows_and_keeps_going() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logs_bad").expect("create");
    let conn = db::db_connect(&store.path().to_string_lossy()).expect("db connect");
    conn.execute(
        "INSERT INTO \"logs_bad\"(id, body) VALUES('1', 'not json'), ('2', '\"scalar\"'), ('3', X'FF')",
        [],
    )
    .expect("raw insert");
    insert(&store, "logs_bad", json!({"_id": 4, "ok": true}));

    let mut good = Vec::new();
    let mut bad = Vec::new();
    let visited = store
        .scan("logs_bad", &mut |row| match row {
            Ok(d) => good.push(d["_id"].clone()),
            Err(e) => bad.push(e.key),
        })
        .expect("scan completes");
    assert_eq!(visited, 4);
    assert_eq!(good, vec![json!(4)]);
    assert_eq!(bad, vec!["1", "2", "3"]);
}

#[test]
fn whole_number_float_identity_matches_integer_key() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logdata").expect("create");
    assert_eq!(insert(&store, "logdata", json!({"_id": 2})), InsertOutcome::Inserted);
    assert_eq!(
        insert(&store, "logdata", json!({"_id": 2.0})),
        InsertOutcome::AlreadyExists
    );
    assert_eq!(
        insert(&store, "logdata", json!({"_id": {"k": 3.0}})),
        InsertOutcome::Inserted
    );
    assert_eq!(
        insert(&store, "logdata", json!({"_id": {"k": 3}})),
        InsertOutcome::AlreadyExists
    );
    assert_eq!(insert(&store, "logdata", json!({"_id": 2.5})), InsertOutcome::Inserted);
    assert_eq!(db::identity_key(&json!(7.0)).expect("key"), "7");
    assert_eq!(store.count_documents("logdata").expect("count"), 3);
}

#[test]
fn create_index_is_idempotent() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logdata").expect("create");
    let spec = IndexSpec::new(
        "idx_game_serverTimestamp",
        &[("game", 1), ("serverTimestamp", -1)],
    );

    store.create_index("logdata", &spec).expect("first create");
    store.create_index("logdata", &spec).expect("second create is a no-op");
    assert_eq!(index_names(&store, "logdata"), vec!["idx_game_serverTimestamp"]);

    let missing = store.create_index("absent", &spec).expect_err("missing collection");
    assert!(matches!(missing, MigrateError::NotFound(_)));
}

#[test]
fn rename_field_moves_values_with_their_json_types() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logdata").expect("create");
    insert(&store, "logdata", json!({"_id": 1, "dbtimestamp": "2024-01-01T00:00:00Z", "game": "a"}));
    insert(&store, "logdata", json!({"_id": 2, "dbtimestamp": {"$date": 1700000000000i64}}));
    insert(&store, "logdata", json!({"_id": 3, "dbtimestamp": true}));
    insert(&store, "logdata", json!({"_id": 4, "dbtimestamp": null}));
    insert(&store, "logdata", json!({"_id": 5, "serverTimestamp": 42}));

    assert_eq!(store.count_with_field("logdata", "dbtimestamp").expect("count"), 4);
    let modified = store
        .rename_field("logdata", "dbtimestamp", "serverTimestamp")
        .expect("rename");
    assert_eq!(modified, 4);
    assert_eq!(store.count_with_field("logdata", "dbtimestamp").expect("count"), 0);
    assert_eq!(store.count_with_field("logdata", "serverTimestamp").expect("count"), 5);

    let get = |id: i64| {
        store
            .find_one("logdata", "_id", &json!(id))
            .expect("find")
            .expect("present")
    };
    assert_eq!(get(1)["serverTimestamp"], json!("2024-01-01T00:00:00Z"));
    assert_eq!(get(1)["game"], json!("a"));
    assert_eq!(get(2)["serverTimestamp"], json!({"$date": 1700000000000i64}));
    assert_eq!(get(3)["serverTimestamp"], json!(true));
    assert_eq!(get(4)["serverTimestamp"], Value::Null);
    assert!(!get(4).contains_key("dbtimestamp"));
    assert_eq!(get(5)["serverTimestamp"], json!(42));

    assert_eq!(
        store
            .rename_field("logdata", "dbtimestamp", "serverTimestamp")
            .expect("second rename"),
        0
    );
}

#[test]
fn distinct_counts_group_missing_values_under_null() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logdata").expect("create");
    insert(&store, "logdata", json!({"_id": 1, "game": "mhs"}));
    insert(&store, "logdata", json!({"_id": 2, "game": "mhs"}));
    insert(&store, "logdata", json!({"_id": 3, "game": "wildfire"}));
    insert(&store, "logdata", json!({"_id": 4}));

    let counts = store.distinct_counts("logdata", "game").expect("distinct");
    assert_eq!(counts[0], (json!("mhs"), 2));
    assert!(counts.contains(&(json!("wildfire"), 1)));
    assert!(counts.contains(&(Value::Null, 1)));
    assert_eq!(counts.len(), 3);
}

#[test]
fn field_names_that_break_json_paths_are_rejected() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteDocumentStore::open(&tmp.path().join("strata.db")).expect("open");
    store.create_collection("logdata").expect("create");
    let err = store
        .count_with_field("logdata", "bad\"name")
        .expect_err("quote in field");
    assert!(matches!(err, MigrateError::InvalidName(_)));
}
