//! Infrastructure layer - Collaborator implementations

pub mod chat;
pub mod interface;
pub mod logging;
pub mod metrics;
pub mod reply;
pub mod storage;
pub mod workflow;
