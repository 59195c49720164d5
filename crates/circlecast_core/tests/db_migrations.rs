use circlecast_core::db::migrations::latest_version;
use circlecast_core::db::{open_db, open_db_in_memory, DbError};
use circlecast_core::repo::graph_repo::SqliteGraphRepository;
use circlecast_core::RepoError;
use rusqlite::Connection;

const NODE_TABLES: &[&str] = &["users", "circles", "messages", "public_domain", "auth_tokens"];
const EDGE_TABLES: &[&str] = &[
    "chief_of",
    "member_of",
    "part_of",
    "wrote",
    "pub_to",
    "blocked",
    "session_of",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in NODE_TABLES.iter().chain(EDGE_TABLES) {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn migration_seeds_the_public_domain_singleton() {
    let conn = open_db_in_memory().unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM public_domain;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let second = conn.execute(
        "INSERT INTO public_domain (id, created_at) VALUES (2, 0);",
        [],
    );
    assert!(second.is_err(), "only id 1 is allowed");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("circlecast.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "users");
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

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    match SqliteGraphRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        other => panic!("unexpected result: {other:?}"),
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
