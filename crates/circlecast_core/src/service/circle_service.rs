//! Circle use-cases and the visibility predicates shared by other services.
//!
//! # Responsibility
//! - Create circles and manage membership on behalf of authenticated users.
//! - Enforce blocking: a user blocked by a circle's chief cannot join it.
//!
//! # Invariants
//! - `can_see` = circle is linked to the PublicDomain, or the viewer is its
//!   member or chief.
//! - `can_publish` = the publisher is member or chief of the circle.
//! - Joining and blocking are idempotent.

use crate::config::ServicePolicy;
use crate::model::circle::{is_reserved_circle_name, CircleId, CircleSummary};
use crate::repo::circle_repo::{CircleRepository, CircleSearchQuery};
use crate::repo::graph_repo::GraphStore;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::session_service::AuthenticatedUser;
use log::info;

/// Circle listing form; `limit = None` applies the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircleSearchRequest {
    pub owner: String,
    pub public_only: bool,
    pub skip: u32,
    pub limit: Option<u32>,
}

pub(crate) fn can_see<S: CircleRepository>(
    store: &S,
    handle: &str,
    circle_id: CircleId,
) -> ServiceResult<bool> {
    if !store.circle_exists(circle_id)? {
        return Err(ServiceError::CircleNotFound(circle_id));
    }
    if store.circle_linked_to_public_domain(circle_id)? {
        return Ok(true);
    }
    Ok(store.user_is_member_or_chief_of(handle, circle_id)?)
}

pub(crate) fn can_publish<S: CircleRepository>(
    store: &S,
    handle: &str,
    circle_id: CircleId,
) -> ServiceResult<bool> {
    if !store.circle_exists(circle_id)? {
        return Err(ServiceError::CircleNotFound(circle_id));
    }
    Ok(store.user_is_member_or_chief_of(handle, circle_id)?)
}

pub struct CircleService<S: GraphStore> {
    store: S,
    policy: ServicePolicy,
}

impl<S: GraphStore> CircleService<S> {
    pub fn new(store: S, policy: ServicePolicy) -> Self {
        Self { store, policy }
    }

    pub fn can_see(&self, viewer: &AuthenticatedUser, circle_id: CircleId) -> ServiceResult<bool> {
        can_see(&self.store, viewer.handle(), circle_id)
    }

    pub fn can_publish(
        &self,
        publisher: &AuthenticatedUser,
        circle_id: CircleId,
    ) -> ServiceResult<bool> {
        can_publish(&self.store, publisher.handle(), circle_id)
    }

    /// Creates a circle chiefed by the caller.
    pub fn create_circle(
        &self,
        caller: &AuthenticatedUser,
        name: &str,
        is_public: bool,
    ) -> ServiceResult<CircleId> {
        let name = name.trim();
        if name.is_empty() || is_reserved_circle_name(name) {
            return Err(ServiceError::InvalidCircleName(name.to_string()));
        }
        let circle_id = self
            .store
            .create_circle(caller.handle(), name, is_public)?
            .ok_or(ServiceError::InconsistentState(
                "circle owner or public domain missing",
            ))?;
        info!("event=circle_create module=circle status=ok circle_id={circle_id} public={is_public}");
        Ok(circle_id)
    }

    /// Joins a visible circle unless its chief has blocked the caller.
    pub fn join_circle(&self, caller: &AuthenticatedUser, circle_id: CircleId) -> ServiceResult<()> {
        if !can_see(&self.store, caller.handle(), circle_id)? {
            return Err(ServiceError::Forbidden("join this circle"));
        }
        let chief = self
            .store
            .circle_chief(circle_id)?
            .ok_or(ServiceError::InconsistentState("circle without chief"))?;
        if chief == caller.handle() {
            return Ok(());
        }
        if self.store.block_exists(&chief, caller.handle())? {
            return Err(ServiceError::Blocked);
        }
        if !self.store.join_circle(caller.handle(), circle_id)? {
            return Err(ServiceError::CircleNotFound(circle_id));
        }
        info!("event=circle_join module=circle status=ok circle_id={circle_id}");
        Ok(())
    }

    /// Follows `target` by joining their Broadcast circle.
    pub fn join_broadcast(&self, caller: &AuthenticatedUser, target: &str) -> ServiceResult<()> {
        if !self.store.user_exists(target)? {
            return Err(ServiceError::UserNotFound(target.to_string()));
        }
        if target == caller.handle() {
            return Ok(());
        }
        if self.store.block_exists(target, caller.handle())? {
            return Err(ServiceError::Blocked);
        }
        if !self.store.join_broadcast_of(caller.handle(), target)? {
            return Err(ServiceError::InconsistentState(
                "target user has no broadcast circle",
            ));
        }
        info!("event=broadcast_join module=circle status=ok");
        Ok(())
    }

    /// Adds `target` to a circle the caller chiefs.
    pub fn add_member(
        &self,
        caller: &AuthenticatedUser,
        circle_id: CircleId,
        target: &str,
    ) -> ServiceResult<()> {
        if !self.store.circle_exists(circle_id)? {
            return Err(ServiceError::CircleNotFound(circle_id));
        }
        if !self.store.user_is_chief_of(caller.handle(), circle_id)? {
            return Err(ServiceError::Forbidden("add members to this circle"));
        }
        if !self.store.user_exists(target)? {
            return Err(ServiceError::UserNotFound(target.to_string()));
        }
        if target == caller.handle() {
            return Ok(());
        }
        if self.store.block_exists(caller.handle(), target)? {
            return Err(ServiceError::Forbidden("add a blocked user"));
        }
        if !self.store.join_circle(target, circle_id)? {
            return Err(ServiceError::InconsistentState("membership was not created"));
        }
        info!("event=member_add module=circle status=ok circle_id={circle_id}");
        Ok(())
    }

    /// Removes `target` from every circle the caller chiefs.
    pub fn revoke_membership(&self, caller: &AuthenticatedUser, target: &str) -> ServiceResult<usize> {
        if !self.store.user_exists(target)? {
            return Err(ServiceError::UserNotFound(target.to_string()));
        }
        let removed = self.store.revoke_membership(caller.handle(), target)?;
        info!("event=membership_revoke module=circle status=ok removed={removed}");
        Ok(removed)
    }

    /// Blocks `target` and drops them from the caller's circles.
    pub fn block_user(&self, caller: &AuthenticatedUser, target: &str) -> ServiceResult<()> {
        if target == caller.handle() {
            return Err(ServiceError::CannotBlockSelf);
        }
        if !self.store.user_exists(target)? {
            return Err(ServiceError::UserNotFound(target.to_string()));
        }
        if !self.store.block_user(caller.handle(), target)? {
            return Err(ServiceError::InconsistentState("block edge was not created"));
        }
        let removed = self.store.revoke_membership(caller.handle(), target)?;
        info!("event=user_block module=circle status=ok revoked_memberships={removed}");
        Ok(())
    }

    /// Lists circles `owner` chiefs or belongs to.
    ///
    /// Callers other than the owner only see public circles.
    pub fn search_circles(
        &self,
        caller: &AuthenticatedUser,
        request: &CircleSearchRequest,
    ) -> ServiceResult<Vec<CircleSummary>> {
        if !self.store.user_exists(&request.owner)? {
            return Err(ServiceError::UserNotFound(request.owner.clone()));
        }
        let query = CircleSearchQuery {
            owner: request.owner.clone(),
            public_only: request.public_only || caller.handle() != request.owner,
            skip: request.skip,
            limit: request
                .limit
                .unwrap_or(self.policy.default_search_limit)
                .clamp(1, self.policy.max_search_limit),
        };
        Ok(self.store.search_circles(&query)?)
    }

    /// Looks up one of the caller's own circles by exact name.
    pub fn circle_id_by_name(
        &self,
        caller: &AuthenticatedUser,
        name: &str,
    ) -> ServiceResult<Option<CircleId>> {
        Ok(self.store.circle_id_by_name(caller.handle(), name)?)
    }
}
