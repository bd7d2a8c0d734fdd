//! Runs step actions against a chat session

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::domain::chat::{ChatSession, MessageKind, Sender};
use crate::domain::reply::{ReplyContext, ReplyGenerator};
use crate::domain::workflow::{Action, ActionRunner, SessionContext, Step, WorkflowError};
use crate::infrastructure::metrics;

/// Message shown to the user when a step's action fails
const ACTION_FAILED_MESSAGE: &str = "Something went wrong while preparing a reply.";

/// Appends text and generated replies as agent-authored chat messages
pub struct ChatActionRunner {
    chat: Arc<dyn ChatSession>,
    reply: Arc<dyn ReplyGenerator>,
}

impl std::fmt::Debug for ChatActionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatActionRunner")
            .field("chat", &self.chat)
            .finish_non_exhaustive()
    }
}

impl ChatActionRunner {
    pub fn new(chat: Arc<dyn ChatSession>, reply: Arc<dyn ReplyGenerator>) -> Self {
        Self { chat, reply }
    }

    async fn run_action(
        &self,
        step: &Step,
        action: &Action,
        context: &SessionContext,
    ) -> Result<(), WorkflowError> {
        let content = match action {
            Action::Text { text } => text.clone(),
            Action::Agent(agent) => {
                let agent_id = agent.agent_id.clone().unwrap_or_else(|| context.agent_id.clone());
                let reply_context = ReplyContext::new(agent_id, context.user_id.clone())
                    .for_step(step.id.clone())
                    .with_model(agent.model.clone());

                self.reply
                    .generate(&agent.prompt, &reply_context)
                    .await
                    .map_err(|e| {
                        WorkflowError::action_failed(step.id.as_str(), action.kind_name(), e.to_string())
                    })?
                    .reply
            }
        };

        self.chat
            .append_message(&content, Sender::Agent, MessageKind::Text)
            .await
            .map_err(|e| {
                WorkflowError::action_failed(step.id.as_str(), action.kind_name(), e.to_string())
            })?;

        Ok(())
    }
}

#[async_trait]
impl ActionRunner for ChatActionRunner {
    async fn run_actions(&self, step: &Step, context: &SessionContext) -> Result<(), WorkflowError> {
        for (position, action) in step.actions.iter().enumerate() {
            debug!(step_id = %step.id, position, action = action.kind_name(), "Running action");

            if let Err(e) = self.run_action(step, action, context).await {
                metrics::record_action_failure(action.kind_name());
                error!(step_id = %step.id, error = %e, "Action failed, skipping the rest of the step");

                if let Err(append_error) = self
                    .chat
                    .append_message(ACTION_FAILED_MESSAGE, Sender::Agent, MessageKind::Error)
                    .await
                {
                    error!(error = %append_error, "Failed to surface action failure to the chat");
                }
                return Err(e);
            }
        }

        Ok(())
    }
}
