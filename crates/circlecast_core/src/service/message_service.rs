//! Message use-cases: authoring, publication and visibility-checked reads.
//!
//! # Invariants
//! - Only the author edits, deletes, publishes or unpublishes a message.
//! - Reads by non-authors go through the store's path query; a message the
//!   caller cannot reach is reported as not found.

use crate::model::circle::CircleId;
use crate::model::message::{Message, MessageId};
use crate::repo::graph_repo::GraphStore;
use crate::service::circle_service::can_publish;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::session_service::AuthenticatedUser;
use log::info;

pub struct MessageService<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> MessageService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_message(
        &self,
        caller: &AuthenticatedUser,
        content: &str,
    ) -> ServiceResult<MessageId> {
        ensure_content(content)?;
        let message_id = self
            .store
            .create_message(caller.handle(), content)?
            .ok_or_else(|| ServiceError::UserNotFound(caller.handle().to_string()))?;
        info!("event=message_create module=message status=ok message_id={message_id}");
        Ok(message_id)
    }

    /// Loads a message the caller can reach through one of their circles.
    pub fn get_message(
        &self,
        caller: &AuthenticatedUser,
        message_id: MessageId,
    ) -> ServiceResult<Message> {
        self.store
            .get_visible_message(caller.handle(), message_id)?
            .ok_or(ServiceError::MessageNotFound(message_id))
    }

    pub fn edit_message(
        &self,
        caller: &AuthenticatedUser,
        message_id: MessageId,
        content: &str,
    ) -> ServiceResult<()> {
        ensure_content(content)?;
        self.ensure_author(caller, message_id, "edit another user's message")?;
        if !self.store.update_message_content(message_id, content)? {
            return Err(ServiceError::MessageNotFound(message_id));
        }
        info!("event=message_edit module=message status=ok message_id={message_id}");
        Ok(())
    }

    pub fn delete_message(
        &self,
        caller: &AuthenticatedUser,
        message_id: MessageId,
    ) -> ServiceResult<()> {
        self.ensure_author(caller, message_id, "delete another user's message")?;
        if !self.store.delete_message(message_id)? {
            return Err(ServiceError::MessageNotFound(message_id));
        }
        info!("event=message_delete module=message status=ok message_id={message_id}");
        Ok(())
    }

    /// Publishes the caller's message to a circle they belong to or chief.
    pub fn publish(
        &self,
        caller: &AuthenticatedUser,
        message_id: MessageId,
        circle_id: CircleId,
    ) -> ServiceResult<()> {
        self.ensure_author(caller, message_id, "publish another user's message")?;
        if !can_publish(&self.store, caller.handle(), circle_id)? {
            return Err(ServiceError::Forbidden("publish to this circle"));
        }
        if !self.store.publish_to_circle(message_id, circle_id)? {
            return Err(ServiceError::InconsistentState("publication was not created"));
        }
        info!(
            "event=message_publish module=message status=ok message_id={message_id} circle_id={circle_id}"
        );
        Ok(())
    }

    pub fn unpublish(
        &self,
        caller: &AuthenticatedUser,
        message_id: MessageId,
        circle_id: CircleId,
    ) -> ServiceResult<()> {
        if !self
            .store
            .message_is_published_to(caller.handle(), message_id, circle_id)?
        {
            return Err(ServiceError::Forbidden("unpublish this message"));
        }
        self.store.unpublish_from_circle(message_id, circle_id)?;
        info!(
            "event=message_unpublish module=message status=ok message_id={message_id} circle_id={circle_id}"
        );
        Ok(())
    }

    /// Every message the caller wrote, published or not.
    pub fn list_authored_messages(&self, caller: &AuthenticatedUser) -> ServiceResult<Vec<Message>> {
        Ok(self.store.list_messages_by_author(caller.handle())?)
    }

    /// Messages by `author` that the caller can reach.
    pub fn list_messages_by_author(
        &self,
        caller: &AuthenticatedUser,
        author: &str,
    ) -> ServiceResult<Vec<Message>> {
        if author == caller.handle() {
            return self.list_authored_messages(caller);
        }
        if !self.store.user_exists(author)? {
            return Err(ServiceError::UserNotFound(author.to_string()));
        }
        Ok(self
            .store
            .list_visible_messages_by_author(caller.handle(), author)?)
    }

    fn ensure_author(
        &self,
        caller: &AuthenticatedUser,
        message_id: MessageId,
        action: &'static str,
    ) -> ServiceResult<()> {
        if !self.store.message_exists(message_id)? {
            return Err(ServiceError::MessageNotFound(message_id));
        }
        if !self.store.message_authored_by(caller.handle(), message_id)? {
            return Err(ServiceError::Forbidden(action));
        }
        Ok(())
    }
}

fn ensure_content(content: &str) -> ServiceResult<()> {
    if content.trim().is_empty() {
        return Err(ServiceError::EmptyContent);
    }
    Ok(())
}
