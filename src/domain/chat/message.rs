use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// How a message should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Error,
}

/// A message appended to a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>, sender: Sender, kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Append-only view of one conversation
///
/// The engine never reads or mutates prior messages.
#[async_trait]
pub trait ChatSession: Send + Sync + Debug {
    async fn append_message(
        &self,
        content: &str,
        sender: Sender,
        kind: MessageKind,
    ) -> Result<ChatMessage, DomainError>;
}
