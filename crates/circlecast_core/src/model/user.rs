//! User node projections.

use serde::{Deserialize, Serialize};

/// Full user node projection, minus credentials.
///
/// The password hash never leaves the repository boundary through this type;
/// credential checks go through dedicated lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable external identifier.
    pub handle: String,
    pub email: String,
    /// Empty until the user sets one.
    pub display_name: String,
    /// Unix epoch milliseconds.
    pub joined_at: i64,
}

/// Search result row: `{handle, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub handle: String,
    pub name: String,
}

impl From<UserRecord> for UserSummary {
    fn from(value: UserRecord) -> Self {
        Self {
            handle: value.handle,
            name: value.display_name,
        }
    }
}
