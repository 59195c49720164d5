//! Session lifecycle: login, token resolution and logout.
//!
//! # Responsibility
//! - Exchange a handle and password for a time-limited token.
//! - Resolve tokens into `AuthenticatedUser` values for the other services.
//!
//! # Invariants
//! - Unknown handle and wrong password produce the same error.
//! - `AuthenticatedUser` can only be constructed inside this crate, so every
//!   privileged call starts from a resolved live token.
//! - Token values are never logged.

use crate::config::ServicePolicy;
use crate::credentials::verify_password;
use crate::model::session::{AuthToken, Clock, SystemClock};
use crate::repo::graph_repo::GraphStore;
use crate::service::error::{ServiceError, ServiceResult};
use log::{info, warn};

/// Identity proven by a live session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    handle: String,
}

impl AuthenticatedUser {
    pub(crate) fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Session service over a graph store and a clock.
pub struct SessionService<S: GraphStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    ttl_ms: i64,
}

impl<S: GraphStore> SessionService<S, SystemClock> {
    /// Creates a service using wall-clock time.
    pub fn new(store: S, policy: ServicePolicy) -> Self {
        Self::with_clock(store, SystemClock, policy)
    }
}

impl<S: GraphStore, C: Clock> SessionService<S, C> {
    pub fn with_clock(store: S, clock: C, policy: ServicePolicy) -> Self {
        Self {
            store,
            clock,
            ttl_ms: policy.session_ttl_ms,
        }
    }

    /// Verifies credentials and issues a fresh token, replacing any prior one.
    pub fn login(&self, handle: &str, password: &str) -> ServiceResult<AuthToken> {
        let Some(stored_hash) = self.store.get_password_hash(handle)? else {
            warn!("event=login module=session status=rejected reason=invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, &stored_hash)? {
            warn!("event=login module=session status=rejected reason=invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        }

        let now = self.clock.now_epoch_ms();
        let token = self
            .store
            .issue_session(handle, now, self.ttl_ms)?
            .ok_or(ServiceError::InconsistentState(
                "verified user vanished before session issue",
            ))?;
        info!(
            "event=login module=session status=ok expires_at={}",
            token.expires_at
        );
        Ok(token)
    }

    /// Resolves a live token into the identity it proves.
    pub fn authenticate(&self, token: &str) -> ServiceResult<AuthenticatedUser> {
        let now = self.clock.now_epoch_ms();
        self.store
            .resolve_handle_from_token(token, now)?
            .map(AuthenticatedUser::new)
            .ok_or(ServiceError::InvalidSession)
    }

    /// Returns whether the token currently authenticates someone.
    pub fn is_live(&self, token: &str) -> ServiceResult<bool> {
        Ok(self
            .store
            .token_belongs_to_live_user(token, self.clock.now_epoch_ms())?)
    }

    /// Ends the session the token belongs to.
    pub fn logout(&self, token: &str) -> ServiceResult<()> {
        self.authenticate(token)?;
        if !self.store.destroy_session(token)? {
            return Err(ServiceError::InvalidSession);
        }
        info!("event=logout module=session status=ok");
        Ok(())
    }

    /// Deletes expired tokens; lookups already ignore them.
    pub fn purge_expired(&self) -> ServiceResult<usize> {
        let removed = self
            .store
            .purge_expired_sessions(self.clock.now_epoch_ms())?;
        info!("event=session_purge module=session status=ok removed={removed}");
        Ok(removed)
    }
}
