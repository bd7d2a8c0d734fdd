//! Workflow domain module
//!
//! Workflows are ordered steps. Each step is guarded by a list of conditions
//! (implicit AND, with explicit `and`/`or` groups allowed) and produces an
//! ordered list of actions when it fires.
//!
//! ## Condition kinds
//!
//! - `Always` - trivially satisfied
//! - `Step` - the referenced step has a session for the user
//! - `Workflow` - every step of the referenced workflow has a session
//! - `UiEvent` - the firing interface event matches
//! - `JudgedByAgent` - an agent judges a prior step's outcome as true
//!
//! A non-repeatable step fires at most once per (step, user); the
//! `StepSession` row is the durable record of that.

mod action;
mod condition;
mod entity;
mod error;
mod executor;
mod ids;
pub mod legacy;
mod record;
pub mod repository;
mod session;
mod trigger;

pub use action::{Action, AgentAction};
pub use condition::{Condition, JudgedByAgent, UiEvent};
pub use entity::{Status, Step, Workflow};
pub use error::WorkflowError;
pub use executor::{ActionRunner, StepOutcome, TriggerReport, WorkflowExecutor};
pub use ids::{AgentId, StepId, UserId, WorkflowId};
pub use record::{
    decode_step, parse_step, AgentWorkflowRecord, DecodedStep, PayloadEncoding, StepRecord,
    WorkflowRecord,
};
pub use repository::{StepRepository, WorkflowRepository};
pub use session::{SessionContext, StepSession};
pub use trigger::{ElementTarget, Trigger, TriggerSource};

#[cfg(test)]
pub use executor::MockActionRunner;
#[cfg(test)]
pub use repository::{MockStepRepository, MockWorkflowRepository};
