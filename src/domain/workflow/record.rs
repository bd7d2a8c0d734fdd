//! Persisted wire shapes for workflows and steps

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::entity::{Status, Step, Workflow};
use super::ids::{AgentId, StepId, WorkflowId};
use super::legacy::{decode_actions, decode_conditions};

/// How condition/action payloads are written back to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadEncoding {
    /// Tagged unions stored as JSON values
    #[default]
    Structured,
    /// Tagged unions stored as JSON-encoded strings
    Legacy,
}

/// A `steps` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub workflow_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub status: Status,

    #[serde(default, alias = "is_beast_mode", alias = "is_repeat")]
    pub is_repeatable: bool,

    #[serde(default)]
    pub conditions: Value,

    #[serde(default)]
    pub action: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl StepRecord {
    pub fn from_step(step: &Step, encoding: PayloadEncoding) -> Self {
        let conditions = serde_json::to_value(&step.conditions).unwrap_or(Value::Null);
        let action = serde_json::to_value(&step.actions).unwrap_or(Value::Null);

        Self {
            id: step.id.to_string(),
            workflow_id: step.workflow_id.to_string(),
            name: step.name.clone(),
            description: step.description.clone(),
            index: step.index,
            status: step.status,
            is_repeatable: step.is_repeatable,
            conditions: encode(conditions, encoding),
            action: encode(action, encoding),
            created_at: None,
        }
    }
}

fn encode(value: Value, encoding: PayloadEncoding) -> Value {
    match encoding {
        PayloadEncoding::Structured => value,
        PayloadEncoding::Legacy => Value::String(value.to_string()),
    }
}

/// A `workflows` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Status,
}

impl WorkflowRecord {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id.to_string(),
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            status: workflow.status,
        }
    }

    /// Builds the workflow entity with the given (already parsed) steps
    pub fn into_workflow(self, steps: Vec<Step>) -> Workflow {
        let mut workflow = Workflow {
            id: WorkflowId::from(self.id),
            name: self.name,
            description: self.description,
            status: self.status,
            steps,
        };
        workflow.sort_steps();
        workflow
    }
}

/// An `agent_workflows` row assigning a workflow to an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentWorkflowRecord {
    pub agent_id: AgentId,
    pub workflow_id: WorkflowId,
}

/// A parsed step plus the payload fragments that had to be dropped
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStep {
    pub step: Step,
    pub dropped_conditions: Vec<Value>,
    pub dropped_actions: Vec<Value>,
}

impl DecodedStep {
    pub fn is_clean(&self) -> bool {
        self.dropped_conditions.is_empty() && self.dropped_actions.is_empty()
    }
}

/// Decodes a step row, reporting what could not be understood
pub fn decode_step(record: StepRecord) -> DecodedStep {
    let conditions = decode_conditions(&record.conditions);
    let actions = decode_actions(&record.action);

    DecodedStep {
        step: Step {
            id: StepId::from(record.id),
            workflow_id: WorkflowId::from(record.workflow_id),
            name: record.name,
            description: record.description,
            status: record.status,
            index: record.index,
            is_repeatable: record.is_repeatable,
            conditions: conditions.items,
            actions: actions.items,
        },
        dropped_conditions: conditions.dropped,
        dropped_actions: actions.dropped,
    }
}

/// Decodes a step row; unrecognized payload fragments are logged and dropped
pub fn parse_step(record: StepRecord) -> Step {
    let decoded = decode_step(record);

    for fragment in &decoded.dropped_conditions {
        warn!(step_id = %decoded.step.id, payload = %fragment, "Dropping unrecognized condition");
    }
    for fragment in &decoded.dropped_actions {
        warn!(step_id = %decoded.step.id, payload = %fragment, "Dropping unrecognized action");
    }

    decoded.step
}
