//! Workflow Trigger Engine
//!
//! Fires agent workflow steps from live interface events:
//! - Steps guarded by heterogeneous conditions (UI events, step/workflow
//!   dependencies, agent judgments)
//! - A live registry from rendered elements to the steps tagged on them
//! - At-most-once execution per (step, user), serialized by a single lock
//! - Storage-backed repositories over an in-memory or PostgreSQL table store

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
