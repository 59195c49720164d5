//! Circle node projections and reserved circle names.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable opaque circle identifier.
pub type CircleId = Uuid;

/// Name of the private default circle created at signup.
pub const GOLD_CIRCLE: &str = "Gold";
/// Name of the public default circle created at signup.
pub const BROADCAST_CIRCLE: &str = "Broadcast";

/// Returns whether `name` collides with a default circle name.
pub fn is_reserved_circle_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(GOLD_CIRCLE) || name.eq_ignore_ascii_case(BROADCAST_CIRCLE)
}

/// How a user relates to a circle in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleRole {
    Chief,
    Member,
}

/// Circle row as seen from one user's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleSummary {
    pub id: CircleId,
    pub name: String,
    /// Handle of the single chief.
    pub chief: String,
    /// Linked to the PublicDomain marker.
    pub is_public: bool,
    pub role: CircleRole,
}

/// The singleton PublicDomain marker node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicDomain {
    /// Unix epoch milliseconds of first creation.
    pub created_at: i64,
}
