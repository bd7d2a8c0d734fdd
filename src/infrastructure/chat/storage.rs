//! Chat session persisted to the `messages` table

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::chat::{ChatMessage, ChatSession, MessageKind, Sender};
use crate::domain::storage::{tables, to_row, Storage};
use crate::domain::workflow::{AgentId, UserId};
use crate::domain::DomainError;

/// JSON carried in a message row's `content` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
}

/// A `messages` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// Encoded [`MessageContent`]
    pub content: String,
    pub sender: Sender,
    pub agent_id: AgentId,
    pub user_id: UserId,
    pub created_at: String,
}

impl MessageRecord {
    fn from_message(message: &ChatMessage, agent_id: &AgentId, user_id: &UserId) -> Result<Self, DomainError> {
        let content = MessageContent {
            kind: message.kind,
            content: message.content.clone(),
        };
        let content = serde_json::to_string(&content)
            .map_err(|e| DomainError::internal(format!("Failed to encode message: {}", e)))?;

        Ok(Self {
            id: message.id.clone(),
            content,
            sender: message.sender,
            agent_id: agent_id.clone(),
            user_id: user_id.clone(),
            created_at: message.created_at.to_rfc3339(),
        })
    }

    /// Decodes the `content` column; rows written as plain text read back as text messages
    pub fn decode_content(&self) -> MessageContent {
        serde_json::from_str(&self.content).unwrap_or_else(|_| MessageContent {
            kind: MessageKind::Text,
            content: self.content.clone(),
        })
    }
}

/// Conversation between one user and one agent, backed by [`Storage`]
pub struct StorageChatSession {
    storage: Arc<dyn Storage>,
    agent_id: AgentId,
    user_id: UserId,
}

impl std::fmt::Debug for StorageChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageChatSession")
            .field("agent_id", &self.agent_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl StorageChatSession {
    pub fn new(storage: Arc<dyn Storage>, agent_id: AgentId, user_id: UserId) -> Self {
        Self {
            storage,
            agent_id,
            user_id,
        }
    }
}

#[async_trait]
impl ChatSession for StorageChatSession {
    async fn append_message(
        &self,
        content: &str,
        sender: Sender,
        kind: MessageKind,
    ) -> Result<ChatMessage, DomainError> {
        let message = ChatMessage::new(content, sender, kind);
        let record = MessageRecord::from_message(&message, &self.agent_id, &self.user_id)?;

        self.storage.create(tables::MESSAGES, to_row(&record)?).await?;
        debug!(message_id = %message.id, user_id = %self.user_id, "Message appended");

        Ok(message)
    }
}
