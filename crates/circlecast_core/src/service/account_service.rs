//! Account use-cases: signup, credentials, profile, search and deletion.
//!
//! # Invariants
//! - A user exists only together with their `Gold` and `Broadcast` circles;
//!   a failure between the two writes surfaces as `InconsistentState`.
//! - Handle and email uniqueness are checked before creation. Two concurrent
//!   signups may both pass the check; the store's unique keys reject the
//!   loser, which is reported as `HandleTaken`.
//! - Deletion failures never reveal whether the handle exists.

use crate::config::ServicePolicy;
use crate::credentials::{
    hash_password, normalize_display_name, validate_email, validate_handle,
    validate_new_password, verify_password, InputError,
};
use crate::model::circle::CircleId;
use crate::model::user::{UserRecord, UserSummary};
use crate::repo::graph_repo::GraphStore;
use crate::repo::user_repo::{UserSearchQuery, UserSort};
use crate::service::circle_service::can_see;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::session_service::AuthenticatedUser;
use log::{info, warn};

/// Signup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub handle: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Password change form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// User search form; `limit = None` applies the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSearchRequest {
    pub handle_prefix: String,
    pub circle: Option<CircleId>,
    pub skip: u32,
    pub limit: Option<u32>,
    pub sort: UserSort,
}

pub struct AccountService<S: GraphStore> {
    store: S,
    policy: ServicePolicy,
}

impl<S: GraphStore> AccountService<S> {
    pub fn new(store: S, policy: ServicePolicy) -> Self {
        Self { store, policy }
    }

    /// Registers a user and creates their default circles.
    pub fn signup(&self, request: &SignupRequest) -> ServiceResult<UserRecord> {
        validate_handle(&request.handle)?;
        validate_email(&request.email)?;
        validate_new_password(
            &request.password,
            &request.confirm_password,
            self.policy.min_password_len,
        )?;

        if self.store.handle_exists(&request.handle)? {
            return Err(ServiceError::HandleTaken(request.handle.clone()));
        }
        if self.store.email_exists(&request.email)? {
            return Err(ServiceError::EmailTaken(request.email.clone()));
        }

        let password_hash = hash_password(&request.password)?;
        if !self
            .store
            .create_user(&request.handle, &request.email, &password_hash)?
        {
            // Lost a race with a concurrent signup.
            return Err(ServiceError::HandleTaken(request.handle.clone()));
        }
        if !self.store.create_default_circles(&request.handle)? {
            warn!("event=signup module=account status=error error_code=default_circles_missing");
            return Err(ServiceError::InconsistentState(
                "user created without default circles",
            ));
        }

        let user = self
            .store
            .get_user(&request.handle)?
            .ok_or(ServiceError::InconsistentState(
                "created user not found in read-back",
            ))?;
        info!("event=signup module=account status=ok");
        Ok(user)
    }

    pub fn get_user(&self, handle: &str) -> ServiceResult<UserRecord> {
        self.store
            .get_user(handle)?
            .ok_or_else(|| ServiceError::UserNotFound(handle.to_string()))
    }

    /// Changes the caller's own password after re-verifying the current one.
    pub fn change_password(
        &self,
        caller: &AuthenticatedUser,
        handle: &str,
        change: &PasswordChange,
    ) -> ServiceResult<()> {
        if caller.handle() != handle {
            return Err(ServiceError::Forbidden("change another user's password"));
        }
        self.verify_credentials(handle, &change.current_password)?;
        validate_new_password(
            &change.new_password,
            &change.confirm_password,
            self.policy.min_password_len,
        )?;
        if change.new_password == change.current_password {
            return Err(InputError::PasswordUnchanged.into());
        }

        let password_hash = hash_password(&change.new_password)?;
        if !self.store.update_password(handle, &password_hash)? {
            return Err(ServiceError::UserNotFound(handle.to_string()));
        }
        info!("event=password_change module=account status=ok");
        Ok(())
    }

    pub fn set_display_name(
        &self,
        caller: &AuthenticatedUser,
        name: &str,
    ) -> ServiceResult<UserRecord> {
        let name = normalize_display_name(name)?;
        if !self.store.set_display_name(caller.handle(), &name)? {
            return Err(ServiceError::UserNotFound(caller.handle().to_string()));
        }
        self.get_user(caller.handle())
    }

    /// Deletes an account given its handle and password.
    pub fn delete_user(&self, handle: &str, password: &str) -> ServiceResult<()> {
        self.verify_credentials(handle, password)?;
        if !self.store.delete_user_cascade(handle)? {
            return Err(ServiceError::InvalidCredentials);
        }
        info!("event=user_delete module=account status=ok");
        Ok(())
    }

    /// Searches users by handle prefix.
    ///
    /// A circle filter requires an authenticated caller who can see the circle.
    pub fn search_users(
        &self,
        caller: Option<&AuthenticatedUser>,
        request: &UserSearchRequest,
    ) -> ServiceResult<Vec<UserSummary>> {
        if let Some(circle_id) = request.circle {
            let Some(caller) = caller else {
                return Err(ServiceError::InvalidSession);
            };
            if !can_see(&self.store, caller.handle(), circle_id)? {
                return Err(ServiceError::Forbidden("search this circle"));
            }
        }

        let query = UserSearchQuery {
            handle_prefix: request.handle_prefix.clone(),
            circle: request.circle,
            skip: request.skip,
            limit: self.effective_limit(request.limit),
            sort: request.sort,
        };
        Ok(self.store.search_users(&query)?)
    }

    fn effective_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.policy.default_search_limit)
            .clamp(1, self.policy.max_search_limit)
    }

    fn verify_credentials(&self, handle: &str, password: &str) -> ServiceResult<()> {
        let Some(stored_hash) = self.store.get_password_hash(handle)? else {
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, &stored_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(())
    }
}
