//! Step action model

use serde::{Deserialize, Serialize};

use super::ids::AgentId;

/// Effect produced by a fired step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Append a literal agent-authored message
    Text { text: String },

    /// Ask the reply generator for a completion and append it
    Agent(AgentAction),
}

/// Arguments of an agent-generated reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    pub prompt: String,

    /// Agent to answer as; defaults to the session's agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,

    /// Model hint forwarded to the reply generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Action {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn agent(prompt: impl Into<String>) -> Self {
        Self::Agent(AgentAction {
            prompt: prompt.into(),
            agent_id: None,
            model: None,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Agent(_) => "agent",
        }
    }
}

impl AgentAction {
    pub fn with_agent(mut self, agent_id: impl Into<AgentId>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_serialization_shape() {
        assert_eq!(
            serde_json::to_value(Action::text("Welcome!")).unwrap(),
            json!({"type": "text", "text": "Welcome!"})
        );
        assert_eq!(
            serde_json::to_value(Action::agent("Summarize")).unwrap(),
            json!({"type": "agent", "prompt": "Summarize"})
        );
    }

    #[test]
    fn test_agent_action_builders() {
        let Action::Agent(agent) = Action::agent("Hi") else {
            panic!("expected agent action");
        };
        let agent = agent.with_agent("agent-2").with_model("gpt-4o");

        assert_eq!(agent.agent_id, Some(AgentId::from("agent-2")));
        assert_eq!(agent.model.as_deref(), Some("gpt-4o"));
    }
}
