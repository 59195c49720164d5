//! SQLite graph store handle shared by every repository trait.
//!
//! # Responsibility
//! - Own the borrowed connection all query templates run against.
//! - Provide whole-graph administration (reset) used by bootstrap and tests.
//!
//! # Invariants
//! - Construction fails unless the connection is fully migrated.
//! - Multi-statement writes run in `BEGIN IMMEDIATE` transactions so
//!   concurrent writers on the same file are serialized by SQLite.

use super::circle_repo::CircleRepository;
use super::message_repo::MessageRepository;
use super::session_repo::SessionRepository;
use super::user_repo::UserRepository;
use super::{RepoError, RepoResult};
use crate::db::migrations::latest_version;
use log::warn;
use rusqlite::{Connection, Params, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Whole-graph operations that are not part of normal request handling.
pub trait GraphAdminRepository {
    /// Deletes every node and edge, including the PublicDomain marker.
    fn delete_all_nodes_and_relations(&self) -> RepoResult<()>;
}

/// Everything the domain services need from the graph store.
pub trait GraphStore:
    UserRepository + CircleRepository + MessageRepository + SessionRepository + GraphAdminRepository
{
}

impl<T> GraphStore for T where
    T: UserRepository
        + CircleRepository
        + MessageRepository
        + SessionRepository
        + GraphAdminRepository
{
}

/// SQLite-backed graph store.
///
/// Cheap to copy; every copy borrows the same connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteGraphRepository<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteGraphRepository<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Opens an immediate (write-locking) transaction on the shared connection.
    pub(crate) fn write_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl GraphAdminRepository for SqliteGraphRepository<'_> {
    fn delete_all_nodes_and_relations(&self) -> RepoResult<()> {
        let tx = self.write_tx()?;
        tx.execute_batch(
            "DELETE FROM session_of;
             DELETE FROM pub_to;
             DELETE FROM wrote;
             DELETE FROM blocked;
             DELETE FROM member_of;
             DELETE FROM part_of;
             DELETE FROM chief_of;
             DELETE FROM auth_tokens;
             DELETE FROM messages;
             DELETE FROM circles;
             DELETE FROM users;
             DELETE FROM public_domain;",
        )?;
        tx.commit()?;
        warn!("event=graph_reset module=repo status=ok");
        Ok(())
    }
}

/// Runs a `SELECT EXISTS(...)` style query and returns its boolean.
pub(crate) fn query_exists(conn: &Connection, sql: &str, params: impl Params) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(exists == 1)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
