//! Workflow engine error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur while loading, evaluating or running steps
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Dangling {kind} reference: {id}")]
    DanglingReference { kind: String, id: String },

    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error("Ambiguous judgment: {0}")]
    JudgmentAmbiguous(String),

    #[error("Judgment timed out after {timeout_ms}ms")]
    JudgmentTimeout { timeout_ms: u64 },

    #[error("Action '{action}' failed in step '{step}': {message}")]
    ActionFailed {
        step: String,
        action: String,
        message: String,
    },
}

impl WorkflowError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    pub fn dangling_reference(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DanglingReference {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }

    pub fn judgment_ambiguous(message: impl Into<String>) -> Self {
        Self::JudgmentAmbiguous(message.into())
    }

    pub fn judgment_timeout(timeout_ms: u64) -> Self {
        Self::JudgmentTimeout { timeout_ms }
    }

    pub fn action_failed(
        step: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ActionFailed {
            step: step.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Malformed or dangling data: logged and skipped, never fatal
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload(_) | Self::DanglingReference { .. }
        )
    }

    /// Judgment failures fail closed
    pub fn is_judgment_ambiguity(&self) -> bool {
        matches!(
            self,
            Self::JudgmentAmbiguous(_) | Self::JudgmentTimeout { .. }
        )
    }
}

impl From<DomainError> for WorkflowError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => Self::InvalidPayload(message),
            other => Self::Collaborator(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::dangling_reference("step", "s-404");
        assert_eq!(err.to_string(), "Dangling step reference: s-404");

        let err = WorkflowError::action_failed("s1", "agent", "connection refused");
        assert_eq!(
            err.to_string(),
            "Action 'agent' failed in step 's1': connection refused"
        );

        let err = WorkflowError::judgment_timeout(10_000);
        assert_eq!(err.to_string(), "Judgment timed out after 10000ms");
    }

    #[test]
    fn test_error_classification() {
        assert!(WorkflowError::invalid_payload("bad").is_data_error());
        assert!(WorkflowError::judgment_timeout(1).is_judgment_ambiguity());
        assert!(!WorkflowError::collaborator("down").is_data_error());
    }

    #[test]
    fn test_from_domain_error() {
        let err: WorkflowError = DomainError::storage("connection lost").into();
        assert!(matches!(err, WorkflowError::Collaborator(_)));

        let err: WorkflowError = DomainError::validation("bad row").into();
        assert_eq!(err, WorkflowError::InvalidPayload("bad row".to_string()));
    }
}
