//! In-memory chat session

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::chat::{ChatMessage, ChatSession, MessageKind, Sender};
use crate::domain::DomainError;

/// Conversation kept in process memory, used by tests and the replay command
#[derive(Debug, Default)]
pub struct InMemoryChatSession {
    messages: RwLock<Vec<ChatMessage>>,
}

impl InMemoryChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages appended so far, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages
            .read()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatSession for InMemoryChatSession {
    async fn append_message(
        &self,
        content: &str,
        sender: Sender,
        kind: MessageKind,
    ) -> Result<ChatMessage, DomainError> {
        let message = ChatMessage::new(content, sender, kind);

        self.messages
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?
            .push(message.clone());

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_keeps_order() {
        let chat = InMemoryChatSession::new();

        chat.append_message("first", Sender::User, MessageKind::Text)
            .await
            .unwrap();
        chat.append_message("second", Sender::Agent, MessageKind::Error)
            .await
            .unwrap();

        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].sender, Sender::Agent);
        assert_eq!(messages[1].kind, MessageKind::Error);
    }
}
