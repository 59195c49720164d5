//! Core of circlecast: a circle-based social graph with session auth.
//!
//! Storage is SQLite laid out as a property graph (`db`), queried through
//! per-operation templates (`repo`), and exposed as authorization-aware
//! use-cases (`service`).

pub mod config;
pub mod credentials;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ServicePolicy, Settings};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_from_settings, init_logging, logging_status};
pub use model::circle::{CircleId, CircleRole, CircleSummary, BROADCAST_CIRCLE, GOLD_CIRCLE};
pub use model::message::{Message, MessageId};
pub use model::session::{AuthToken, Clock, SystemClock};
pub use model::user::{UserRecord, UserSummary};
pub use repo::graph_repo::{GraphStore, SqliteGraphRepository};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::{
    AccountService, PasswordChange, SignupRequest, UserSearchRequest,
};
pub use service::admin_service::AdminService;
pub use service::circle_service::{CircleSearchRequest, CircleService};
pub use service::error::{ErrorKind, ServiceError, ServiceResult};
pub use service::message_service::MessageService;
pub use service::session_service::{AuthenticatedUser, SessionService};

/// Liveness probe.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
