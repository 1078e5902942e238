use logdata_migrate::core::config::MigrateConfig;
use logdata_migrate::core::db::SqliteDocumentStore;
use logdata_migrate::core::error::MigrateError;
use logdata_migrate::core::journal::Journal;
use logdata_migrate::core::store::{Document, DocumentStore, InsertOutcome};
use logdata_migrate::jobs::JobContext;
use logdata_migrate::jobs::rename::{rename_field, rename_timestamp};
use serde_json::{Value, json};
use tempfile::tempdir;

fn seed_logdata(store: &SqliteDocumentStore, docs: &[Value]) {
    store.create_collection("logdata").expect("create");
    for d in docs {
        let Value::Object(map) = d.clone() else {
            panic!("test document must be an object")
        };
        let id = map["_id"].clone();
        assert_eq!(store.insert_one("logdata", &id, &map), InsertOutcome::Inserted);
    }
}

fn snapshot(store: &SqliteDocumentStore) -> Vec<Document> {
    let mut out = Vec::new();
    store
        .scan("logdata", &mut |d| out.push(d.expect("readable row")))
        .expect("scan");
    out
}

#[test]
fn renames_deprecated_timestamp_and_keeps_values() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("strata.db");
    let store = SqliteDocumentStore::open(&db_path).expect("open");
    let config = MigrateConfig::default();
    let journal = Journal::for_database(&db_path);
    seed_logdata(
        &store,
        &[
            json!({"_id": 1, "game": "mhs", "dbtimestamp": "2023-05-01T10:00:00Z", "playerId": "p1"}),
            json!({"_id": 2, "game": "mhs", "dbtimestamp": 1682935200}),
            json!({"_id": 3, "game": "wildfire", "serverTimestamp": "2024-02-02T00:00:00Z"}),
        ],
    );

    let ctx = JobContext::new(&store, &config, &journal);
    let report = rename_timestamp(&ctx).expect("rename");
    assert_eq!(report.before, 2);
    assert_eq!(report.modified, 2);
    assert_eq!(report.after, 3);
    assert_eq!(report.remaining, 0);

    let docs = snapshot(&store);
    assert!(docs.iter().all(|d| !d.contains_key("dbtimestamp")));
    assert_eq!(docs[0]["serverTimestamp"], json!("2023-05-01T10:00:00Z"));
    assert_eq!(docs[0]["playerId"], json!("p1"));
    assert_eq!(docs[0]["_id"], json!(1));
    assert_eq!(docs[1]["serverTimestamp"], json!(1682935200));
    assert_eq!(docs[2]["serverTimestamp"], json!("2024-02-02T00:00:00Z"));
}

#[test]
fn second_run_matches_nothing_and_writes_nothing() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("strata.db");
    let store = SqliteDocumentStore::open(&db_path).expect("open");
    let config = MigrateConfig::default();
    let journal = Journal::for_database(&db_path);
    seed_logdata(&store, &[json!({"_id": 1, "dbtimestamp": 5})]);

    let ctx = JobContext::new(&store, &config, &journal);
    rename_timestamp(&ctx).expect("first run");
    let before_second = snapshot(&store);

    let report = rename_timestamp(&ctx).expect("second run");
    assert_eq!(report.before, 0);
    assert_eq!(report.modified, 0);
    assert_eq!(report.after, 1);
    assert_eq!(snapshot(&store), before_second);
}

#[test]
fn already_canonical_collection_is_left_unchanged() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("strata.db");
    let store = SqliteDocumentStore::open(&db_path).expect("open");
    let config = MigrateConfig::default();
    let journal = Journal::for_database(&db_path);
    seed_logdata(
        &store,
        &[
            json!({"_id": 1, "serverTimestamp": 1}),
            json!({"_id": 2, "serverTimestamp": 2}),
        ],
    );
    let original = snapshot(&store);

    let ctx = JobContext::new(&store, &config, &journal);
    let report = rename_timestamp(&ctx).expect("rename");
    assert_eq!(report.before, 0);
    assert_eq!(report.modified, 0);
    assert_eq!(report.after, 2);
    assert_eq!(snapshot(&store), original);

    let events = journal.events().expect("journal");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].op, "rename.bulk");
    assert_eq!(events[0].status, "success");
}

#[test]
fn partially_renamed_collection_converges() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("strata.db");
    let store = SqliteDocumentStore::open(&db_path).expect("open");
    let config = MigrateConfig::default();
    let journal = Journal::for_database(&db_path);
    // As left behind by an interrupted run: one renamed, one not.
    seed_logdata(
        &store,
        &[
            json!({"_id": 1, "serverTimestamp": 10}),
            json!({"_id": 2, "dbtimestamp": 20}),
        ],
    );

    let ctx = JobContext::new(&store, &config, &journal);
    let report = rename_timestamp(&ctx).expect("rename");
    assert_eq!(report.before, 1);
    assert_eq!(report.modified, 1);
    assert_eq!(report.after, 2);
    let docs = snapshot(&store);
    assert_eq!(docs[0]["serverTimestamp"], json!(10));
    assert_eq!(docs[1]["serverTimestamp"], json!(20));
}

#[test]
fn missing_target_collection_is_an_error() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("strata.db");
    let store = SqliteDocumentStore::open(&db_path).expect("open");
    let config = MigrateConfig::default();
    let journal = Journal::for_database(&db_path);

    let ctx = JobContext::new(&store, &config, &journal);
    let err = rename_timestamp(&ctx).expect_err("no logdata yet");
    assert!(matches!(err, MigrateError::NotFound(_)), "{err}");
}

#[test]
fn arbitrary_field_pairs_can_be_renamed() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("strata.db");
    let store = SqliteDocumentStore::open(&db_path).expect("open");
    let config = MigrateConfig::default();
    let journal = Journal::for_database(&db_path);
    seed_logdata(&store, &[json!({"_id": 1, "player": "p1"})]);

    let ctx = JobContext::new(&store, &config, &journal);
    let report = rename_field(&ctx, "logdata", "player", "playerId").expect("rename");
    assert_eq!(report.modified, 1);
    assert_eq!(snapshot(&store)[0]["playerId"], json!("p1"));
}
