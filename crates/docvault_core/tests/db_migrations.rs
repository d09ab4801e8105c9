use docvault_core::db::migrations::latest_version;
use docvault_core::db::{open_db, open_db_in_memory, open_db_with_config, DbError};
use docvault_core::CoreConfig;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_buckets");
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn system_buckets_are_seeded() {
    let conn = open_db_in_memory().unwrap();

    for bucket in [
        "userresourcemappingsv1",
        "organizationsv1",
        "organizationindexv1",
        "usersv1",
        "userindexv1",
    ] {
        let exists: i64 = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_buckets WHERE name = ?1);",
                [bucket.as_bytes()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1, "bucket {bucket} was not seeded");
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docvault.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "kv_entries");
}

#[test]
fn open_db_with_config_uses_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");

    let conn = open_db_with_config(&CoreConfig::for_path(path.clone())).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    drop(conn);
    assert!(path.exists());

    let conn = open_db_with_config(&CoreConfig::default()).unwrap();
    assert_table_exists(&conn, "kv_buckets");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
