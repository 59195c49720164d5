//! User node queries: identity, credentials, blocking and account deletion.
//!
//! # Responsibility
//! - Create and look up `users` nodes.
//! - Maintain `BLOCKED` edges and revoke memberships held under a chief.
//! - Remove a user and everything that cascades from them in one transaction.
//!
//! # Invariants
//! - `create_user` never overwrites: a handle or email collision reports
//!   `false` instead of an error.
//! - Handle search patterns are built from an escaped prefix, so user input is
//!   never interpreted as regex syntax.

use super::graph_repo::{query_exists, SqliteGraphRepository};
use super::RepoResult;
use crate::model::circle::CircleId;
use crate::model::session::now_epoch_ms;
use crate::model::user::{UserRecord, UserSummary};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

/// Ordering applied to user search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    #[default]
    HandleAsc,
    HandleDesc,
    /// Oldest accounts first.
    Joined,
}

/// Query options for user search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSearchQuery {
    /// Case-insensitive handle prefix; empty matches everyone.
    pub handle_prefix: String,
    /// Only users that are member or chief of this circle.
    pub circle: Option<CircleId>,
    pub skip: u32,
    pub limit: u32,
    pub sort: UserSort,
}

/// Repository interface for user nodes and user-to-user edges.
pub trait UserRepository {
    /// Creates one user node; `false` when handle or email is already taken.
    fn create_user(&self, handle: &str, email: &str, password_hash: &str) -> RepoResult<bool>;
    /// Returns whether a user with this handle exists.
    fn handle_exists(&self, handle: &str) -> RepoResult<bool>;
    /// Returns whether any user registered this email (case-insensitive).
    fn email_exists(&self, email: &str) -> RepoResult<bool>;
    /// Returns whether the user node exists.
    fn user_exists(&self, handle: &str) -> RepoResult<bool> {
        self.handle_exists(handle)
    }
    /// Loads one user projection.
    fn get_user(&self, handle: &str) -> RepoResult<Option<UserRecord>>;
    /// Loads the stored PHC password hash.
    fn get_password_hash(&self, handle: &str) -> RepoResult<Option<String>>;
    /// Replaces the stored password hash.
    fn update_password(&self, handle: &str, new_password_hash: &str) -> RepoResult<bool>;
    /// Replaces the display name.
    fn set_display_name(&self, handle: &str, name: &str) -> RepoResult<bool>;
    /// Creates `handle -[:BLOCKED]-> target` unless it already exists.
    fn block_user(&self, handle: &str, target: &str) -> RepoResult<bool>;
    /// Returns whether `handle` has blocked `target`.
    fn block_exists(&self, handle: &str, target: &str) -> RepoResult<bool>;
    /// Removes `target`'s memberships in every circle chiefed by `handle`.
    fn revoke_membership(&self, handle: &str, target: &str) -> RepoResult<usize>;
    /// Lists `{handle, name}` rows matching the query.
    fn search_users(&self, query: &UserSearchQuery) -> RepoResult<Vec<UserSummary>>;
    /// Deletes the user and every node and edge that cascades from them.
    fn delete_user_cascade(&self, handle: &str) -> RepoResult<bool>;
}

impl UserRepository for SqliteGraphRepository<'_> {
    fn create_user(&self, handle: &str, email: &str, password_hash: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO users (handle, email, password_hash, display_name, joined_at)
             VALUES (?1, ?2, ?3, '', ?4)
             ON CONFLICT DO NOTHING;",
            params![handle, email, password_hash, now_epoch_ms()],
        )?;
        Ok(changed > 0)
    }

    fn handle_exists(&self, handle: &str) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM users WHERE handle = ?1);",
            [handle],
        )
    }

    fn email_exists(&self, email: &str) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE);",
            [email],
        )
    }

    fn get_user(&self, handle: &str) -> RepoResult<Option<UserRecord>> {
        let user = self
            .conn
            .query_row(
                "SELECT handle, email, display_name, joined_at
                 FROM users
                 WHERE handle = ?1;",
                [handle],
                |row| {
                    Ok(UserRecord {
                        handle: row.get("handle")?,
                        email: row.get("email")?,
                        display_name: row.get("display_name")?,
                        joined_at: row.get("joined_at")?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn get_password_hash(&self, handle: &str) -> RepoResult<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE handle = ?1;",
                [handle],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    fn update_password(&self, handle: &str, new_password_hash: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET password_hash = ?2 WHERE handle = ?1;",
            params![handle, new_password_hash],
        )?;
        Ok(changed > 0)
    }

    fn set_display_name(&self, handle: &str, name: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET display_name = ?2 WHERE handle = ?1;",
            params![handle, name],
        )?;
        Ok(changed > 0)
    }

    fn block_user(&self, handle: &str, target: &str) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT OR IGNORE INTO blocked (blocker_handle, blocked_handle, blocked_at)
             SELECT u.handle, t.handle, ?3
             FROM users u, users t
             WHERE u.handle = ?1
               AND t.handle = ?2;",
            params![handle, target, now_epoch_ms()],
        )?;
        let exists = query_exists(
            &tx,
            "SELECT EXISTS(
                SELECT 1 FROM blocked WHERE blocker_handle = ?1 AND blocked_handle = ?2
            );",
            [handle, target],
        )?;
        tx.commit()?;
        Ok(exists)
    }

    fn block_exists(&self, handle: &str, target: &str) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM blocked WHERE blocker_handle = ?1 AND blocked_handle = ?2
            );",
            [handle, target],
        )
    }

    fn revoke_membership(&self, handle: &str, target: &str) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM member_of
             WHERE user_handle = ?2
               AND circle_id IN (SELECT circle_id FROM chief_of WHERE user_handle = ?1);",
            [handle, target],
        )?;
        Ok(removed)
    }

    fn search_users(&self, query: &UserSearchQuery) -> RepoResult<Vec<UserSummary>> {
        let mut sql = String::from(
            "SELECT u.handle AS handle, u.display_name AS display_name
             FROM users u
             WHERE u.handle REGEXP ?",
        );
        let mut bind_values: Vec<Value> =
            vec![Value::Text(handle_prefix_pattern(&query.handle_prefix))];

        if let Some(circle_id) = query.circle {
            sql.push_str(
                " AND (
                    EXISTS (
                        SELECT 1 FROM member_of mo
                        WHERE mo.user_handle = u.handle AND mo.circle_id = ?
                    )
                    OR EXISTS (
                        SELECT 1 FROM chief_of co
                        WHERE co.user_handle = u.handle AND co.circle_id = ?
                    )
                )",
            );
            bind_values.push(Value::Text(circle_id.to_string()));
            bind_values.push(Value::Text(circle_id.to_string()));
        }

        sql.push_str(match query.sort {
            UserSort::HandleAsc => " ORDER BY u.handle ASC",
            UserSort::HandleDesc => " ORDER BY u.handle DESC",
            UserSort::Joined => " ORDER BY u.joined_at ASC, u.rowid ASC",
        });
        sql.push_str(" LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.limit)));
        bind_values.push(Value::Integer(i64::from(query.skip)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(UserSummary {
                handle: row.get("handle")?,
                name: row.get("display_name")?,
            });
        }
        Ok(users)
    }

    fn delete_user_cascade(&self, handle: &str) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        if !query_exists(
            &tx,
            "SELECT EXISTS(SELECT 1 FROM users WHERE handle = ?1);",
            [handle],
        )? {
            return Ok(false);
        }

        let tokens = tx.execute(
            "DELETE FROM auth_tokens
             WHERE value IN (SELECT token_value FROM session_of WHERE user_handle = ?1);",
            [handle],
        )?;
        // PUB_TO and WROTE edges go with the message rows.
        let messages = tx.execute(
            "DELETE FROM messages
             WHERE id IN (SELECT message_id FROM wrote WHERE user_handle = ?1);",
            [handle],
        )?;
        let memberships = tx.execute("DELETE FROM member_of WHERE user_handle = ?1;", [handle])?;
        let blocks = tx.execute("DELETE FROM blocked WHERE blocker_handle = ?1;", [handle])?;
        // Chiefed circles take their memberships and publications with them;
        // a circle never outlives its only chief.
        let circles = tx.execute(
            "DELETE FROM circles
             WHERE id IN (SELECT circle_id FROM chief_of WHERE user_handle = ?1);",
            [handle],
        )?;
        tx.execute("DELETE FROM users WHERE handle = ?1;", [handle])?;
        tx.commit()?;

        debug!(
            "event=user_cascade module=repo status=ok tokens={} messages={} memberships={} blocks={} circles={}",
            tokens, messages, memberships, blocks, circles
        );
        Ok(true)
    }
}

/// Builds the anchored, case-insensitive regex used for handle prefix search.
pub fn handle_prefix_pattern(prefix: &str) -> String {
    format!("(?i)^{}", regex::escape(prefix.trim()))
}
