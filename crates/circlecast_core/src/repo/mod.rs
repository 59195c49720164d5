//! Query layer: one graph query template per read/write operation.
//!
//! # Responsibility
//! - Bind parameters into SQL over the node/edge tables and project minimal
//!   result shapes.
//! - Keep every multi-statement write inside one SQLite transaction.
//!
//! # Invariants
//! - No business rules live here; callers decide what a miss means.
//! - A query that matches nothing returns `false`, `None` or an empty list.
//! - Storage failures surface as `RepoError` and are never folded into a
//!   "not found" answer.

pub mod circle_repo;
pub mod graph_repo;
pub mod message_repo;
pub mod session_repo;
pub mod user_repo;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised below the business-rule boundary.
///
/// Every variant means the store could not answer; none of them means
/// "condition not satisfied".
#[derive(Debug)]
pub enum RepoError {
    /// SQLite failure: unreachable file, malformed statement, lock timeout.
    Db(DbError),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted into a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "graph repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted graph data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
