//! Step execution sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{AgentId, StepId, UserId};

/// Durable fact that a step has fired for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSession {
    pub id: String,
    pub step_id: StepId,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
}

impl StepSession {
    pub fn new(step_id: StepId, user_id: UserId, agent_id: AgentId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            step_id,
            user_id,
            agent_id,
            created_at: Utc::now(),
        }
    }
}

/// Identity of the conversation a workflow session runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub agent_id: AgentId,
    pub user_id: UserId,
}

impl SessionContext {
    pub fn new(agent_id: impl Into<AgentId>, user_id: impl Into<UserId>) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: user_id.into(),
        }
    }
}
