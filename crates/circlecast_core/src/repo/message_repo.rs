//! Message node queries, publication edges and path-based visibility reads.
//!
//! # Responsibility
//! - Create messages with their `WROTE` edge and manage `PUB_TO` edges.
//! - Answer visibility questions with a single path query, never by loading
//!   broadly and filtering afterwards.
//!
//! # Invariants
//! - A message row always has exactly one `WROTE` edge.
//! - Author listings are ordered by `created_at ASC`, insertion order on ties.
//! - A viewer reaches a message only through
//!   `author -WROTE-> message -PUB_TO-> circle <-MEMBER_OF|CHIEF_OF- viewer`.

use super::graph_repo::{parse_uuid, query_exists, SqliteGraphRepository};
use super::RepoResult;
use crate::model::circle::CircleId;
use crate::model::message::{Message, MessageId};
use crate::model::session::now_epoch_ms;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

const MESSAGE_SELECT_SQL: &str = "SELECT
    m.id AS id,
    w.user_handle AS author,
    m.content AS content,
    m.created_at AS created_at,
    m.last_saved_at AS last_saved_at
FROM messages m
INNER JOIN wrote w ON w.message_id = m.id";

// Binds the viewer handle as ?1.
const VISIBLE_TO_VIEWER_SQL: &str = "EXISTS (
    SELECT 1
    FROM pub_to p
    WHERE p.message_id = m.id
      AND (
        EXISTS (
            SELECT 1 FROM member_of mo
            WHERE mo.circle_id = p.circle_id AND mo.user_handle = ?1
        )
        OR EXISTS (
            SELECT 1 FROM chief_of co
            WHERE co.circle_id = p.circle_id AND co.user_handle = ?1
        )
      )
)";

/// Repository interface for message nodes and publication edges.
pub trait MessageRepository {
    /// Creates one message authored by `handle`.
    fn create_message(&self, handle: &str, content: &str) -> RepoResult<Option<MessageId>>;
    /// Returns whether the message node exists.
    fn message_exists(&self, message_id: MessageId) -> RepoResult<bool>;
    /// Returns whether `handle` wrote the message.
    fn message_authored_by(&self, handle: &str, message_id: MessageId) -> RepoResult<bool>;
    /// Creates `message -[:PUB_TO]-> circle` unless present.
    fn publish_to_circle(&self, message_id: MessageId, circle_id: CircleId) -> RepoResult<bool>;
    /// Deletes `message -[:PUB_TO]-> circle`.
    fn unpublish_from_circle(&self, message_id: MessageId, circle_id: CircleId)
        -> RepoResult<bool>;
    /// Returns whether `handle` wrote the message and it is published to the circle.
    fn message_is_published_to(
        &self,
        handle: &str,
        message_id: MessageId,
        circle_id: CircleId,
    ) -> RepoResult<bool>;
    /// Lists every message written by `handle`, oldest first.
    fn list_messages_by_author(&self, handle: &str) -> RepoResult<Vec<Message>>;
    /// Lists messages written by `author` that `viewer` can reach, oldest first.
    fn list_visible_messages_by_author(
        &self,
        viewer: &str,
        author: &str,
    ) -> RepoResult<Vec<Message>>;
    /// Loads one message only if `viewer` can reach it.
    fn get_visible_message(&self, viewer: &str, message_id: MessageId)
        -> RepoResult<Option<Message>>;
    /// Replaces content and bumps `last_saved_at`.
    fn update_message_content(&self, message_id: MessageId, content: &str) -> RepoResult<bool>;
    /// Deletes the message with its `WROTE` and `PUB_TO` edges.
    fn delete_message(&self, message_id: MessageId) -> RepoResult<bool>;
}

impl MessageRepository for SqliteGraphRepository<'_> {
    fn create_message(&self, handle: &str, content: &str) -> RepoResult<Option<MessageId>> {
        let tx = self.write_tx()?;
        if !query_exists(
            &tx,
            "SELECT EXISTS(SELECT 1 FROM users WHERE handle = ?1);",
            [handle],
        )? {
            return Ok(None);
        }

        let message_id = Uuid::new_v4();
        let now = now_epoch_ms();
        tx.execute(
            "INSERT INTO messages (id, content, created_at, last_saved_at)
             VALUES (?1, ?2, ?3, ?3);",
            params![message_id.to_string(), content, now],
        )?;
        tx.execute(
            "INSERT INTO wrote (user_handle, message_id) VALUES (?1, ?2);",
            params![handle, message_id.to_string()],
        )?;
        tx.commit()?;
        Ok(Some(message_id))
    }

    fn message_exists(&self, message_id: MessageId) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1);",
            [message_id.to_string()],
        )
    }

    fn message_authored_by(&self, handle: &str, message_id: MessageId) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM wrote WHERE user_handle = ?1 AND message_id = ?2
            );",
            params![handle, message_id.to_string()],
        )
    }

    fn publish_to_circle(&self, message_id: MessageId, circle_id: CircleId) -> RepoResult<bool> {
        let message_id = message_id.to_string();
        let circle_id = circle_id.to_string();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT OR IGNORE INTO pub_to (message_id, circle_id, published_at)
             SELECT m.id, c.id, ?3
             FROM messages m, circles c
             WHERE m.id = ?1
               AND c.id = ?2;",
            params![message_id, circle_id, now_epoch_ms()],
        )?;
        let published = query_exists(
            &tx,
            "SELECT EXISTS(SELECT 1 FROM pub_to WHERE message_id = ?1 AND circle_id = ?2);",
            [message_id.as_str(), circle_id.as_str()],
        )?;
        tx.commit()?;
        Ok(published)
    }

    fn unpublish_from_circle(
        &self,
        message_id: MessageId,
        circle_id: CircleId,
    ) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM pub_to WHERE message_id = ?1 AND circle_id = ?2;",
            [message_id.to_string(), circle_id.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn message_is_published_to(
        &self,
        handle: &str,
        message_id: MessageId,
        circle_id: CircleId,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1
                FROM wrote w
                INNER JOIN pub_to p ON p.message_id = w.message_id
                WHERE w.user_handle = ?1
                  AND w.message_id = ?2
                  AND p.circle_id = ?3
            );",
            params![handle, message_id.to_string(), circle_id.to_string()],
        )
    }

    fn list_messages_by_author(&self, handle: &str) -> RepoResult<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MESSAGE_SELECT_SQL}
             WHERE w.user_handle = ?1
             ORDER BY m.created_at ASC, m.rowid ASC;"
        ))?;
        let mut rows = stmt.query([handle])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(parse_message_row(row)?);
        }
        Ok(messages)
    }

    fn list_visible_messages_by_author(
        &self,
        viewer: &str,
        author: &str,
    ) -> RepoResult<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MESSAGE_SELECT_SQL}
             WHERE w.user_handle = ?2
               AND {VISIBLE_TO_VIEWER_SQL}
             ORDER BY m.created_at ASC, m.rowid ASC;"
        ))?;
        let mut rows = stmt.query([viewer, author])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(parse_message_row(row)?);
        }
        Ok(messages)
    }

    fn get_visible_message(
        &self,
        viewer: &str,
        message_id: MessageId,
    ) -> RepoResult<Option<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MESSAGE_SELECT_SQL}
             WHERE m.id = ?2
               AND {VISIBLE_TO_VIEWER_SQL};"
        ))?;
        let message = stmt
            .query_row(params![viewer, message_id.to_string()], |row| {
                Ok(parse_message_row(row))
            })
            .optional()?;
        message.transpose()
    }

    fn update_message_content(&self, message_id: MessageId, content: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE messages SET content = ?2, last_saved_at = ?3 WHERE id = ?1;",
            params![message_id.to_string(), content, now_epoch_ms()],
        )?;
        Ok(changed > 0)
    }

    fn delete_message(&self, message_id: MessageId) -> RepoResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM messages WHERE id = ?1;", [message_id.to_string()])?;
        Ok(removed > 0)
    }
}

fn parse_message_row(row: &Row<'_>) -> RepoResult<Message> {
    let id_text: String = row.get("id")?;
    Ok(Message {
        id: parse_uuid(&id_text, "messages.id")?,
        author: row.get("author")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        last_saved_at: row.get("last_saved_at")?,
    })
}
