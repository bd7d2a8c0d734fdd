//! CLI module for the workflow trigger engine
//!
//! Provides subcommands:
//! - `replay`: run a scripted host session against stored workflows
//! - `validate`: check stored step payloads for unparseable or dangling parts

mod fixture;
pub mod replay;
pub mod validate;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Workflow trigger engine - fires agent workflow steps from interface events
#[derive(Parser)]
#[command(name = "workflow-trigger-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay scripted host events for one user session and print the transcript
    Replay(replay::ReplayArgs),

    /// Validate stored workflows and steps
    Validate(validate::ValidateArgs),
}

/// Loads `.env` and configuration, then installs logging
fn init() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);
    config
}
