//! Graph-shaped domain model for users, circles, messages and sessions.
//!
//! # Responsibility
//! - Define the read models projected out of the graph store.
//! - Name the reserved default circles every account receives.
//!
//! # Invariants
//! - A user is identified by its `handle`; circles and messages by stable
//!   opaque ids that are never reused.
//! - Relationship data lives on edges, never nested inside node records.

pub mod circle;
pub mod message;
pub mod session;
pub mod user;
