//! Session token model and clock abstraction.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque bearer credential bound to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub value: String,
    /// Unix epoch milliseconds; the token is live while `now < expires_at`.
    pub expires_at: i64,
}

impl AuthToken {
    /// Returns whether this token is still live at `now_ms`.
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

/// Source of "now" for expiry decisions.
pub trait Clock {
    /// Current time in unix epoch milliseconds.
    fn now_epoch_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        now_epoch_ms()
    }
}

/// Current wall-clock time in unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
