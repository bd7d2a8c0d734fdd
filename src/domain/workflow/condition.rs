//! Step condition model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{AgentId, StepId, WorkflowId};

/// Interface events a step can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEvent {
    /// The host interface finished loading
    OnPageLoad,
    /// A backgrounded view became visible again
    OnVisited,
    /// A tagged element was clicked
    OnClicked,
    /// The pointer entered a tagged element
    OnHovered,
}

impl UiEvent {
    pub fn all() -> [Self; 4] {
        [Self::OnPageLoad, Self::OnVisited, Self::OnClicked, Self::OnHovered]
    }

    /// Broadcast events are evaluated against every step, not a single element
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::OnPageLoad | Self::OnVisited)
    }

    /// Name used by the legacy camelCase encoding
    pub fn legacy_name(&self) -> &'static str {
        match self {
            Self::OnPageLoad => "onPageLoad",
            Self::OnVisited => "onVisited",
            Self::OnClicked => "onClicked",
            Self::OnHovered => "onHovered",
        }
    }

    /// Accepts both the legacy camelCase and the snake_case names
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|event| event.legacy_name() == name || event.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnPageLoad => "on_page_load",
            Self::OnVisited => "on_visited",
            Self::OnClicked => "on_clicked",
            Self::OnHovered => "on_hovered",
        }
    }
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Arguments of an agent-judged condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgedByAgent {
    /// The prior step whose outcome is judged
    pub step_id: StepId,
    /// The agent asked for the judgment
    pub agent_id: AgentId,
    /// Question put to the agent; the answer is read as a boolean
    pub prompt: String,
}

/// A predicate gating whether a step may fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Always,
    Step { step_id: StepId },
    Workflow { workflow_id: WorkflowId },
    UiEvent { event: UiEvent },
    JudgedByAgent(JudgedByAgent),
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
}

impl Condition {
    pub fn step(step_id: impl Into<StepId>) -> Self {
        Self::Step {
            step_id: step_id.into(),
        }
    }

    pub fn workflow(workflow_id: impl Into<WorkflowId>) -> Self {
        Self::Workflow {
            workflow_id: workflow_id.into(),
        }
    }

    pub fn ui_event(event: UiEvent) -> Self {
        Self::UiEvent { event }
    }

    pub fn judged_by_agent(
        step_id: impl Into<StepId>,
        agent_id: impl Into<AgentId>,
        prompt: impl Into<String>,
    ) -> Self {
        Self::JudgedByAgent(JudgedByAgent {
            step_id: step_id.into(),
            agent_id: agent_id.into(),
            prompt: prompt.into(),
        })
    }

    /// A condition that can never be satisfied (empty disjunction)
    pub fn never() -> Self {
        Self::Or {
            conditions: Vec::new(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Step { .. } => "step",
            Self::Workflow { .. } => "workflow",
            Self::UiEvent { .. } => "ui_event",
            Self::JudgedByAgent(_) => "judged_by_agent",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
        }
    }

    /// Visits this condition and every nested one
    pub fn any(&self, predicate: &impl Fn(&Condition) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        match self {
            Self::And { conditions } | Self::Or { conditions } => {
                conditions.iter().any(|c| c.any(predicate))
            }
            _ => false,
        }
    }

    pub fn mentions_ui_event(&self, event: UiEvent) -> bool {
        self.any(&|c| matches!(c, Self::UiEvent { event: e } if *e == event))
    }

    pub fn has_ui_event(&self) -> bool {
        self.any(&|c| matches!(c, Self::UiEvent { .. }))
    }

    /// True for `Step` and `JudgedByAgent` conditions pointing at `step_id`
    pub fn depends_on_step(&self, step_id: &StepId) -> bool {
        self.any(&|c| match c {
            Self::Step { step_id: id } => id == step_id,
            Self::JudgedByAgent(judged) => &judged.step_id == step_id,
            _ => false,
        })
    }

    pub fn depends_on_workflow(&self, workflow_id: &WorkflowId) -> bool {
        self.any(&|c| matches!(c, Self::Workflow { workflow_id: id } if id == workflow_id))
    }
}
