use rusqlite::Connection;
use wp1_core::db::migrations::latest_version;
use wp1_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "projects");
    assert_table_exists(&conn, "ratings");
    assert_table_exists(&conn, "categories");
    assert_table_exists(&conn, "moves");
    assert_table_exists(&conn, "logging");
    assert_table_exists(&conn, "namespacename");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wp10.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO projects (p_project, p_timestamp) VALUES ('Test', '20200101000000');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
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
        DbError::UnsupportedSchemaVersion { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_database_in_missing_directory_reports_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("wp10.db");

    let err = open_db(&path).unwrap_err();
    assert_eq!(err.error_code(), "db_open_failed");
    match &err {
        DbError::Open { location, .. } => assert_eq!(location, &path),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("wp10.db"));
}

#[test]
fn logging_rejects_unknown_actions() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO logging (
            l_project, l_namespace, l_article, l_action, l_timestamp, l_revision_timestamp
        ) VALUES ('Test', 0, 'Foo', 'both', '20200101000000', '2020-01-01T00:00:00Z');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn categories_reject_unknown_kinds() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO categories (c_project, c_type, c_rating, c_ranking)
         VALUES ('Test', 'both', 'FA-Class', 500);",
        [],
    );
    assert!(result.is_err());
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
