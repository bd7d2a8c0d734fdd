use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::workflow::legacy::{decode_conditions, unwrap_encoded};
use crate::domain::workflow::{Condition, StepId, WorkflowError};

/// Identity of a live interface element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An inserted or removed element and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub id: ElementId,

    /// Serialized `{type: "step", payload}` tag, when the element carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,
}

impl ElementNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(id),
            metadata: None,
            children: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    /// Tags this element with a step payload
    pub fn tagged(self, step_id: &str, conditions: &[Condition]) -> Self {
        let metadata = serde_json::json!({
            "type": "step",
            "payload": {"id": step_id, "conditions": conditions},
        });
        self.with_metadata(metadata.to_string())
    }

    /// Depth-first walk over this node and its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ElementNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Step metadata decoded from an element tag
#[derive(Debug, Clone, PartialEq)]
pub struct ElementPayload {
    pub step_id: StepId,
    pub conditions: Vec<Condition>,
}

impl ElementPayload {
    /// Parses a `{type: "step", payload: {id, conditions}}` tag
    pub fn parse(metadata: &str) -> Result<Self, WorkflowError> {
        let value: Value = serde_json::from_str(metadata)
            .map(|v| unwrap_encoded(&v))
            .map_err(|e| WorkflowError::invalid_payload(format!("Element metadata is not JSON: {}", e)))?;

        let kind = value.get("type").and_then(Value::as_str);
        if kind != Some("step") {
            return Err(WorkflowError::invalid_payload(format!(
                "Unsupported element tag type: {}",
                kind.unwrap_or("<missing>")
            )));
        }

        let payload = value
            .get("payload")
            .map(unwrap_encoded)
            .ok_or_else(|| WorkflowError::invalid_payload("Element tag has no payload"))?;

        let step_id = ["id", "stepId", "step_id"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WorkflowError::invalid_payload("Element payload has no step id"))?;

        let decoded = decode_conditions(payload.get("conditions").unwrap_or(&Value::Null));
        for fragment in &decoded.dropped {
            warn!(step_id, payload = %fragment, "Dropping unrecognized element condition");
        }

        Ok(Self {
            step_id: StepId::from(step_id),
            conditions: decoded.items,
        })
    }
}
