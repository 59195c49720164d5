//! Message node projection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable opaque message identifier.
pub type MessageId = Uuid;

/// Message joined with its single author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Handle at the tail of the `WROTE` edge.
    pub author: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds; bumped on every content edit.
    pub last_saved_at: i64,
}
