//! Domain layer - Core entities and collaborator traits

pub mod chat;
pub mod error;
pub mod interface;
pub mod reply;
pub mod storage;
pub mod workflow;

pub use chat::{ChatMessage, ChatSession, MessageKind, Sender};
pub use error::DomainError;
pub use interface::{ElementId, ElementNode, ElementPayload, HostEvent, HostInterface};
pub use reply::{Reply, ReplyContext, ReplyGenerator};
pub use storage::{Row, RowFilter, Storage};
pub use workflow::{
    Action, AgentId, Condition, Status, Step, StepId, StepOutcome, StepRepository, Trigger,
    TriggerReport, UiEvent, UserId, Workflow, WorkflowError, WorkflowExecutor, WorkflowId,
    WorkflowRepository,
};
