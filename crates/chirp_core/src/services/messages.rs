//! crates/chirp_core/src/services/messages.rs
//!
//! Conversations and direct messages.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{ConversationDetails, ConversationOverview, MessageDetails};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};

#[derive(Clone)]
pub struct MessageService {
    db: Arc<dyn DatabaseService>,
}

fn conversation_not_found() -> ServiceError {
    ServiceError::not_found("Conversation not found")
}

impl MessageService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// The creator joins implicitly and must not list themselves.
    pub async fn create_conversation(
        &self,
        creator_id: Uuid,
        participant_ids: Vec<Uuid>,
    ) -> ServiceResult<ConversationDetails> {
        if participant_ids.is_empty() {
            return Err(ServiceError::bad_request("participantIds should not be empty"));
        }
        if participant_ids.contains(&creator_id) {
            return Err(ServiceError::Forbidden(
                "Cannot create conversation with yourself".to_string(),
            ));
        }

        let mut members: Vec<Uuid> = Vec::with_capacity(participant_ids.len() + 1);
        for id in participant_ids {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        for id in &members {
            self.db.get_user(*id).await.map_err(|e| match e {
                PortError::NotFound(_) => {
                    ServiceError::not_found(format!("User with ID {id} not found"))
                }
                other => other.into(),
            })?;
        }
        members.push(creator_id);

        let conversation = self.db.create_conversation(&members).await?;
        info!(
            conversation_id = %conversation.conversation.id,
            participants = members.len(),
            "Conversation created"
        );
        Ok(conversation)
    }

    pub async fn conversations(&self, user_id: Uuid) -> ServiceResult<Vec<ConversationOverview>> {
        Ok(self.db.list_conversations(user_id).await?)
    }

    pub async fn conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<ConversationDetails> {
        self.db
            .find_conversation(conversation_id, user_id)
            .await?
            .ok_or_else(conversation_not_found)
    }

    /// Reading the thread marks everything the other side sent as read.
    pub async fn messages(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Vec<MessageDetails>> {
        self.conversation(conversation_id, user_id).await?;
        Ok(self
            .db
            .list_messages_marking_read(conversation_id, user_id)
            .await?)
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> ServiceResult<MessageDetails> {
        if content.trim().is_empty() {
            return Err(ServiceError::bad_request("content should not be empty"));
        }
        self.conversation(conversation_id, sender_id).await?;
        let message = self
            .db
            .insert_message(conversation_id, sender_id, content)
            .await?;
        info!(
            conversation_id = %conversation_id,
            message_id = %message.message.id,
            "Message sent"
        );
        Ok(message)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> ServiceResult<u64> {
        Ok(self.db.count_unread_messages(user_id).await?)
    }
}
