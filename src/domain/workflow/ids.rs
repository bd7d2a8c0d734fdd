//! Identifier newtypes for workflows, steps, agents and users

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Workflow identifier
    WorkflowId
);

string_id!(
    /// Step identifier
    StepId
);

string_id!(
    /// Agent identifier
    AgentId
);

string_id!(
    /// End-user identifier
    UserId
);

impl StepId {
    /// Generates a fresh step id for steps created in an editor session
    pub fn generate() -> Self {
        Self(format!("step-{}", Uuid::new_v4()))
    }
}

impl WorkflowId {
    /// Prefix used by legacy bare-string workflow references
    pub const LEGACY_PREFIX: &'static str = "workflow-";

    pub fn generate() -> Self {
        Self(format!("{}{}", Self::LEGACY_PREFIX, Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversions() {
        let id = StepId::from("step-1");
        assert_eq!(id.to_string(), "step-1");
        assert_eq!(id.as_str(), "step-1");
        assert_eq!(StepId::new(String::from("step-1")), id);
    }

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let a = StepId::generate();
        let b = StepId::generate();
        assert!(a.as_str().starts_with("step-"));
        assert_ne!(a, b);
        assert!(WorkflowId::generate().as_str().starts_with("workflow-"));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = AgentId::from("agent-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"agent-7\"");
    }
}
