//! AuthToken node queries and the `SESSION_OF` edge.
//!
//! # Invariants
//! - A user holds at most one token; issuing replaces the previous one in the
//!   same transaction.
//! - Expiry is evaluated against the caller-supplied `now`; expired rows may
//!   linger until `purge_expired_sessions`.

use super::graph_repo::{query_exists, SqliteGraphRepository};
use super::RepoResult;
use crate::model::session::AuthToken;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{params, OptionalExtension};

const TOKEN_LEN: usize = 36;

/// Repository interface for session tokens.
pub trait SessionRepository {
    /// Replaces any token of `handle` with a fresh one valid for `ttl_ms`.
    ///
    /// Returns `None` when the user does not exist.
    fn issue_session(&self, handle: &str, now_ms: i64, ttl_ms: i64)
        -> RepoResult<Option<AuthToken>>;
    /// Resolves a live token to its owner handle.
    fn resolve_handle_from_token(&self, token: &str, now_ms: i64) -> RepoResult<Option<String>>;
    /// Returns whether the token is live and bound to an existing user.
    fn token_belongs_to_live_user(&self, token: &str, now_ms: i64) -> RepoResult<bool>;
    /// Deletes the token and its edge.
    fn destroy_session(&self, token: &str) -> RepoResult<bool>;
    /// Deletes every token with `expires_at <= now_ms`.
    fn purge_expired_sessions(&self, now_ms: i64) -> RepoResult<usize>;
}

impl SessionRepository for SqliteGraphRepository<'_> {
    fn issue_session(
        &self,
        handle: &str,
        now_ms: i64,
        ttl_ms: i64,
    ) -> RepoResult<Option<AuthToken>> {
        let tx = self.write_tx()?;
        if !query_exists(
            &tx,
            "SELECT EXISTS(SELECT 1 FROM users WHERE handle = ?1);",
            [handle],
        )? {
            return Ok(None);
        }

        tx.execute(
            "DELETE FROM auth_tokens
             WHERE value IN (SELECT token_value FROM session_of WHERE user_handle = ?1);",
            [handle],
        )?;

        let token = AuthToken {
            value: generate_token_value(),
            expires_at: now_ms.saturating_add(ttl_ms),
        };
        tx.execute(
            "INSERT INTO auth_tokens (value, expires_at, created_at) VALUES (?1, ?2, ?3);",
            params![token.value, token.expires_at, now_ms],
        )?;
        tx.execute(
            "INSERT INTO session_of (token_value, user_handle, created_at) VALUES (?1, ?2, ?3);",
            params![token.value, handle, now_ms],
        )?;
        tx.commit()?;
        Ok(Some(token))
    }

    fn resolve_handle_from_token(&self, token: &str, now_ms: i64) -> RepoResult<Option<String>> {
        let handle = self
            .conn
            .query_row(
                "SELECT s.user_handle
                 FROM auth_tokens t
                 INNER JOIN session_of s ON s.token_value = t.value
                 WHERE t.value = ?1
                   AND t.expires_at > ?2;",
                params![token, now_ms],
                |row| row.get(0),
            )
            .optional()?;
        Ok(handle)
    }

    fn token_belongs_to_live_user(&self, token: &str, now_ms: i64) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1
                FROM auth_tokens t
                INNER JOIN session_of s ON s.token_value = t.value
                INNER JOIN users u ON u.handle = s.user_handle
                WHERE t.value = ?1
                  AND t.expires_at > ?2
            );",
            params![token, now_ms],
        )
    }

    fn destroy_session(&self, token: &str) -> RepoResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM auth_tokens WHERE value = ?1;", [token])?;
        Ok(removed > 0)
    }

    fn purge_expired_sessions(&self, now_ms: i64) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM auth_tokens WHERE expires_at <= ?1;", [now_ms])?;
        Ok(removed)
    }
}

fn generate_token_value() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{generate_token_value, TOKEN_LEN};

    #[test]
    fn token_values_are_alphanumeric_and_distinct() {
        let first = generate_token_value();
        let second = generate_token_value();
        assert_eq!(first.len(), TOKEN_LEN);
        assert!(first.chars().all(|ch| ch.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
