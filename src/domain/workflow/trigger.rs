//! Triggers: observed events that prompt condition evaluation

use std::fmt;

use super::condition::{Condition, UiEvent};
use super::ids::StepId;

/// What caused an evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerSource {
    /// An interface event
    Ui(UiEvent),
    /// Another step just fired
    Dependency(StepId),
}

impl TriggerSource {
    pub fn ui_event(&self) -> Option<UiEvent> {
        match self {
            Self::Ui(event) => Some(*event),
            Self::Dependency(_) => None,
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ui(event) => write!(f, "{}", event),
            Self::Dependency(step_id) => write!(f, "dependency:{}", step_id),
        }
    }
}

/// The tagged element an element-scoped trigger resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTarget {
    pub step_id: StepId,
    /// Conditions carried on the element itself
    pub conditions: Vec<Condition>,
}

/// A trigger handed to the execution engine
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub source: TriggerSource,
    /// Set for click/hover; broadcasts and dependencies carry no element
    pub element: Option<ElementTarget>,
}

impl Trigger {
    /// A load/revisit style trigger evaluated against every step
    pub fn broadcast(event: UiEvent) -> Self {
        Self {
            source: TriggerSource::Ui(event),
            element: None,
        }
    }

    /// A click/hover style trigger on one tagged element
    pub fn element(event: UiEvent, step_id: StepId, conditions: Vec<Condition>) -> Self {
        Self {
            source: TriggerSource::Ui(event),
            element: Some(ElementTarget {
                step_id,
                conditions,
            }),
        }
    }

    /// Re-evaluates the steps that depend on `step_id`
    pub fn dependency(step_id: StepId) -> Self {
        Self {
            source: TriggerSource::Dependency(step_id),
            element: None,
        }
    }
}
