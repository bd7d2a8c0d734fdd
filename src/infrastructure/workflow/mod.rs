//! Workflow infrastructure: storage-backed repositories, condition evaluation,
//! the execution engine and session wiring

mod action_runner;
mod engine;
mod evaluator;
mod session;
mod step_repository;
mod workflow_repository;

pub use action_runner::ChatActionRunner;
pub use engine::{EngineCollaborators, EngineConfig, ExecutionEngine};
pub use evaluator::{parse_verdict, ConditionEvaluator, EvaluationContext};
pub use session::WorkflowSession;
pub use step_repository::StorageStepRepository;
pub use workflow_repository::StorageWorkflowRepository;
