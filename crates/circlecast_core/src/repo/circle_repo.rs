//! Circle node queries: creation, membership edges and visibility predicates.
//!
//! # Responsibility
//! - Get-or-create the PublicDomain singleton.
//! - Create default and custom circles with their `CHIEF_OF`/`PART_OF` edges.
//! - Maintain `MEMBER_OF` edges with create-unique semantics.
//!
//! # Invariants
//! - Exactly one PublicDomain row exists once initialized (`id = 1`).
//! - Every circle is created together with exactly one `CHIEF_OF` edge.
//! - Joining twice never produces a second `MEMBER_OF` edge.

use super::graph_repo::{bool_to_int, parse_uuid, query_exists, SqliteGraphRepository};
use super::RepoResult;
use crate::model::circle::{
    CircleId, CircleRole, CircleSummary, PublicDomain, BROADCAST_CIRCLE, GOLD_CIRCLE,
};
use crate::model::session::now_epoch_ms;
use rusqlite::{params, OptionalExtension, Transaction};
use uuid::Uuid;

/// Query options for circle listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleSearchQuery {
    /// User whose chiefed and joined circles are listed.
    pub owner: String,
    /// Restrict to circles linked to the PublicDomain.
    pub public_only: bool,
    pub skip: u32,
    pub limit: u32,
}

/// Repository interface for circle nodes and membership edges.
pub trait CircleRepository {
    /// Returns the PublicDomain marker, creating it if absent.
    fn create_public_domain_once(&self) -> RepoResult<PublicDomain>;
    /// Creates Gold and Broadcast for `handle`, linking Broadcast publicly.
    fn create_default_circles(&self, handle: &str) -> RepoResult<bool>;
    /// Creates one circle chiefed by `handle`.
    fn create_circle(
        &self,
        handle: &str,
        name: &str,
        is_public: bool,
    ) -> RepoResult<Option<CircleId>>;
    /// Returns whether the circle node exists.
    fn circle_exists(&self, circle_id: CircleId) -> RepoResult<bool>;
    /// Returns whether the circle has a `PART_OF` edge to the PublicDomain.
    fn circle_linked_to_public_domain(&self, circle_id: CircleId) -> RepoResult<bool>;
    /// Returns whether `handle` is member or chief of the circle.
    fn user_is_member_or_chief_of(&self, handle: &str, circle_id: CircleId) -> RepoResult<bool>;
    /// Returns whether `handle` is chief of the circle.
    fn user_is_chief_of(&self, handle: &str, circle_id: CircleId) -> RepoResult<bool>;
    /// Returns the chief handle of the circle.
    fn circle_chief(&self, circle_id: CircleId) -> RepoResult<Option<String>>;
    /// Finds a circle chiefed by `handle` by exact name.
    fn circle_id_by_name(&self, handle: &str, name: &str) -> RepoResult<Option<CircleId>>;
    /// Creates `handle -[:MEMBER_OF]-> circle` unless present.
    fn join_circle(&self, handle: &str, circle_id: CircleId) -> RepoResult<bool>;
    /// Joins the Broadcast circle chiefed by `target` unless already joined.
    fn join_broadcast_of(&self, handle: &str, target: &str) -> RepoResult<bool>;
    /// Lists circles the owner chiefs or belongs to.
    fn search_circles(&self, query: &CircleSearchQuery) -> RepoResult<Vec<CircleSummary>>;
}

impl CircleRepository for SqliteGraphRepository<'_> {
    fn create_public_domain_once(&self) -> RepoResult<PublicDomain> {
        self.conn.execute(
            "INSERT OR IGNORE INTO public_domain (id, iam, created_at)
             VALUES (1, 'PublicDomain', ?1);",
            [now_epoch_ms()],
        )?;
        let created_at =
            self.conn
                .query_row("SELECT created_at FROM public_domain WHERE id = 1;", [], |row| {
                    row.get(0)
                })?;
        Ok(PublicDomain { created_at })
    }

    fn create_default_circles(&self, handle: &str) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        if !user_exists_in_tx(&tx, handle)? || !public_domain_exists_in_tx(&tx)? {
            return Ok(false);
        }
        if chiefed_circle_id(&tx, handle, BROADCAST_CIRCLE)?.is_some() {
            // Defaults already present.
            return Ok(true);
        }

        let now = now_epoch_ms();
        insert_chiefed_circle(&tx, handle, GOLD_CIRCLE, false, now)?;
        insert_chiefed_circle(&tx, handle, BROADCAST_CIRCLE, true, now)?;
        tx.commit()?;
        Ok(true)
    }

    fn create_circle(
        &self,
        handle: &str,
        name: &str,
        is_public: bool,
    ) -> RepoResult<Option<CircleId>> {
        let tx = self.write_tx()?;
        if !user_exists_in_tx(&tx, handle)? {
            return Ok(None);
        }
        if is_public && !public_domain_exists_in_tx(&tx)? {
            return Ok(None);
        }

        let circle_id = insert_chiefed_circle(&tx, handle, name, is_public, now_epoch_ms())?;
        tx.commit()?;
        Ok(Some(circle_id))
    }

    fn circle_exists(&self, circle_id: CircleId) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM circles WHERE id = ?1);",
            [circle_id.to_string()],
        )
    }

    fn circle_linked_to_public_domain(&self, circle_id: CircleId) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1
                FROM part_of po
                INNER JOIN public_domain pd ON pd.id = po.domain_id
                WHERE po.circle_id = ?1
            );",
            [circle_id.to_string()],
        )
    }

    fn user_is_member_or_chief_of(&self, handle: &str, circle_id: CircleId) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM member_of WHERE user_handle = ?1 AND circle_id = ?2
                UNION ALL
                SELECT 1 FROM chief_of WHERE user_handle = ?1 AND circle_id = ?2
            );",
            params![handle, circle_id.to_string()],
        )
    }

    fn user_is_chief_of(&self, handle: &str, circle_id: CircleId) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM chief_of WHERE user_handle = ?1 AND circle_id = ?2
            );",
            params![handle, circle_id.to_string()],
        )
    }

    fn circle_chief(&self, circle_id: CircleId) -> RepoResult<Option<String>> {
        let chief = self
            .conn
            .query_row(
                "SELECT user_handle FROM chief_of WHERE circle_id = ?1;",
                [circle_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(chief)
    }

    fn circle_id_by_name(&self, handle: &str, name: &str) -> RepoResult<Option<CircleId>> {
        chiefed_circle_id(self.conn, handle, name)
    }

    fn join_circle(&self, handle: &str, circle_id: CircleId) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        let joined = insert_membership(&tx, handle, &circle_id.to_string())?;
        tx.commit()?;
        Ok(joined)
    }

    fn join_broadcast_of(&self, handle: &str, target: &str) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        let Some(circle_id) = chiefed_circle_id(&tx, target, BROADCAST_CIRCLE)? else {
            return Ok(false);
        };
        let joined = insert_membership(&tx, handle, &circle_id.to_string())?;
        tx.commit()?;
        Ok(joined)
    }

    fn search_circles(&self, query: &CircleSearchQuery) -> RepoResult<Vec<CircleSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id AS id,
                c.name AS name,
                co.user_handle AS chief,
                EXISTS(SELECT 1 FROM part_of po WHERE po.circle_id = c.id) AS is_public
             FROM circles c
             INNER JOIN chief_of co ON co.circle_id = c.id
             WHERE (
                co.user_handle = ?1
                OR EXISTS (
                    SELECT 1 FROM member_of mo
                    WHERE mo.circle_id = c.id AND mo.user_handle = ?1
                )
             )
               AND (?2 = 0 OR EXISTS(SELECT 1 FROM part_of po WHERE po.circle_id = c.id))
             ORDER BY c.created_at ASC, c.name ASC
             LIMIT ?3 OFFSET ?4;",
        )?;
        let mut rows = stmt.query(params![
            query.owner.as_str(),
            bool_to_int(query.public_only),
            i64::from(query.limit),
            i64::from(query.skip),
        ])?;

        let mut circles = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let chief: String = row.get("chief")?;
            let role = if chief == query.owner {
                CircleRole::Chief
            } else {
                CircleRole::Member
            };
            circles.push(CircleSummary {
                id: parse_uuid(&id_text, "circles.id")?,
                name: row.get("name")?,
                chief,
                is_public: row.get("is_public")?,
                role,
            });
        }
        Ok(circles)
    }
}

fn insert_chiefed_circle(
    tx: &Transaction<'_>,
    handle: &str,
    name: &str,
    is_public: bool,
    now: i64,
) -> RepoResult<CircleId> {
    let circle_id = Uuid::new_v4();
    let id_text = circle_id.to_string();
    tx.execute(
        "INSERT INTO circles (id, name, created_at) VALUES (?1, ?2, ?3);",
        params![id_text, name, now],
    )?;
    tx.execute(
        "INSERT INTO chief_of (user_handle, circle_id, created_at) VALUES (?1, ?2, ?3);",
        params![handle, id_text, now],
    )?;
    if is_public {
        tx.execute(
            "INSERT INTO part_of (circle_id, domain_id) VALUES (?1, 1);",
            [id_text.as_str()],
        )?;
    }
    Ok(circle_id)
}

fn insert_membership(tx: &Transaction<'_>, handle: &str, circle_id: &str) -> RepoResult<bool> {
    tx.execute(
        "INSERT OR IGNORE INTO member_of (user_handle, circle_id, joined_at)
         SELECT u.handle, c.id, ?3
         FROM users u, circles c
         WHERE u.handle = ?1
           AND c.id = ?2;",
        params![handle, circle_id, now_epoch_ms()],
    )?;
    query_exists(
        tx,
        "SELECT EXISTS(
            SELECT 1 FROM member_of WHERE user_handle = ?1 AND circle_id = ?2
        );",
        [handle, circle_id],
    )
}

fn chiefed_circle_id(
    conn: &rusqlite::Connection,
    handle: &str,
    name: &str,
) -> RepoResult<Option<CircleId>> {
    let id_text: Option<String> = conn
        .query_row(
            "SELECT c.id
             FROM chief_of co
             INNER JOIN circles c ON c.id = co.circle_id
             WHERE co.user_handle = ?1
               AND c.name = ?2
             ORDER BY c.created_at ASC
             LIMIT 1;",
            [handle, name],
            |row| row.get(0),
        )
        .optional()?;
    id_text
        .map(|value| parse_uuid(&value, "circles.id"))
        .transpose()
}

fn user_exists_in_tx(tx: &Transaction<'_>, handle: &str) -> RepoResult<bool> {
    query_exists(
        tx,
        "SELECT EXISTS(SELECT 1 FROM users WHERE handle = ?1);",
        [handle],
    )
}

fn public_domain_exists_in_tx(tx: &Transaction<'_>) -> RepoResult<bool> {
    query_exists(
        tx,
        "SELECT EXISTS(SELECT 1 FROM public_domain WHERE id = 1);",
        params![],
    )
}
