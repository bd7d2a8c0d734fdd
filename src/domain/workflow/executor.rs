//! Execution engine contracts and report types

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use super::entity::Step;
use super::error::WorkflowError;
use super::ids::StepId;
use super::session::SessionContext;
use super::trigger::Trigger;

/// What happened to one candidate step for one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Session recorded and actions executed
    Fired,
    /// Fired, but an action failed and the rest were skipped
    FiredWithError,
    /// Another run held the execution lock
    Dropped,
    /// Non-repeatable step already has a session for this user
    AlreadyFired,
    /// Conditions evaluated to false
    ConditionsUnmet,
    /// Recording the session failed; actions were not run
    NotRecorded,
}

impl StepOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, Self::Fired | Self::FiredWithError)
    }
}

/// Per-step outcomes of one trigger, including cascaded dependents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerReport {
    pub outcomes: Vec<(StepId, StepOutcome)>,
}

impl TriggerReport {
    pub fn push(&mut self, step_id: StepId, outcome: StepOutcome) {
        self.outcomes.push((step_id, outcome));
    }

    pub fn extend(&mut self, other: TriggerReport) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn fired(&self) -> Vec<&StepId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.fired())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn outcome(&self, step_id: &StepId) -> Option<StepOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == step_id)
            .map(|(_, outcome)| *outcome)
    }

    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Decides whether steps may fire for a trigger and runs them
#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    async fn trigger(&self, trigger: Trigger) -> Result<TriggerReport, WorkflowError>;
}

/// Executes a fired step's actions against the conversation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Runs `step.actions` in order; stops at the first failure and returns it
    async fn run_actions(&self, step: &Step, context: &SessionContext) -> Result<(), WorkflowError>;
}
