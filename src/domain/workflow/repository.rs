//! Step and workflow repository traits

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::entity::{Step, Workflow};
use super::error::WorkflowError;
use super::ids::{AgentId, StepId, UserId, WorkflowId};
use super::session::StepSession;

/// Persists steps and step execution sessions
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StepRepository: Send + Sync {
    /// Steps of a workflow ordered by `index`; unknown workflows yield an empty list
    async fn list_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<Step>, WorkflowError>;

    /// Diff-based replacement keyed by step id
    ///
    /// Steps missing from `steps` are deleted, known ids are updated in place and
    /// new ids are inserted. Each step's array position becomes its `index`.
    async fn replace_all(
        &self,
        workflow_id: &WorkflowId,
        steps: Vec<Step>,
    ) -> Result<Vec<Step>, WorkflowError>;

    async fn has_session(&self, step_id: &StepId, user_id: &UserId) -> Result<bool, WorkflowError>;

    async fn record_session(
        &self,
        step_id: &StepId,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<StepSession, WorkflowError>;
}

/// Persists workflows and resolves their steps
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Returns `None` (logged) when the workflow does not exist
    async fn get_with_steps(&self, workflow_id: &WorkflowId) -> Result<Option<Workflow>, WorkflowError>;

    /// Workflows assigned to an agent; dangling assignments are skipped
    async fn list_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Workflow>, WorkflowError>;

    /// Upserts the workflow row and replaces its steps
    async fn save(&self, workflow: Workflow) -> Result<Workflow, WorkflowError>;
}
