use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::workflow::{AgentId, StepId, UserId};
use crate::domain::DomainError;

/// Conversation identity a reply is generated for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContext {
    pub agent_id: AgentId,
    pub user_id: UserId,

    /// Step whose action or judgment asked for the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ReplyContext {
    pub fn new(agent_id: AgentId, user_id: UserId) -> Self {
        Self {
            agent_id,
            user_id,
            step_id: None,
            model: None,
        }
    }

    pub fn for_step(mut self, step_id: StepId) -> Self {
        self.step_id = Some(step_id);
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// A generated reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub reply: String,
}

impl Reply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

/// Opaque "generate a reply for this prompt" service; may fail
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, context: &ReplyContext) -> Result<Reply, DomainError>;
}
