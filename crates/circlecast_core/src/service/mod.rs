//! Domain and authorization services.
//!
//! # Responsibility
//! - Compose query-layer calls into use-cases and enforce business rules.
//! - Gate privileged operations behind `AuthenticatedUser`.
//!
//! # Invariants
//! - Services never touch SQL; storage failures pass through as
//!   `ServiceError::Repo` and are never turned into a business answer.
//! - Multi-call use-cases are not atomic as a whole; each store call is.

pub mod account_service;
pub mod admin_service;
pub mod circle_service;
pub mod error;
pub mod message_service;
pub mod session_service;
