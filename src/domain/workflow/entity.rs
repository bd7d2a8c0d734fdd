//! Workflow and step entities

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::condition::{Condition, UiEvent};
use super::ids::{StepId, WorkflowId};

/// Lifecycle status shared by workflows and steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A unit of workflow behavior gated by conditions and producing ordered actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub workflow_id: WorkflowId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Status,

    /// Display and tie-break order within the workflow
    #[serde(default)]
    pub index: u32,

    /// Repeatable steps may fire again after their first session
    #[serde(default)]
    pub is_repeatable: bool,

    /// Evaluated as a logical AND, in declared order
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Executed strictly in declared order
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Step {
    pub fn new(
        id: impl Into<StepId>,
        workflow_id: impl Into<WorkflowId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_id: workflow_id.into(),
            name: name.into(),
            description: None,
            status: Status::Active,
            index: 0,
            is_repeatable: false,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.is_repeatable = true;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn declares_ui_event(&self, event: UiEvent) -> bool {
        self.conditions.iter().any(|c| c.mentions_ui_event(event))
    }

    /// Steps without any UI-event condition are passive: only broadcasts and
    /// dependency cascades reach them
    pub fn is_passive(&self) -> bool {
        !self.conditions.iter().any(Condition::has_ui_event)
    }

    /// True if a firing of `step` (belonging to `workflow_id`) can change this step's outcome
    pub fn depends_on(&self, step_id: &StepId, workflow_id: &WorkflowId) -> bool {
        self.conditions
            .iter()
            .any(|c| c.depends_on_step(step_id) || c.depends_on_workflow(workflow_id))
    }
}

/// A named, ordered collection of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(id: impl Into<WorkflowId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            status: Status::Active,
            steps: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Adds a step, re-homing it under this workflow
    pub fn with_step(mut self, mut step: Step) -> Self {
        step.workflow_id = self.id.clone();
        self.steps.push(step);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Sorts steps by `index`, keeping insertion order for ties
    pub fn sort_steps(&mut self) {
        self.steps.sort_by_key(|s| s.index);
    }

    pub fn active_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.is_active())
    }
}
