use clap::Parser;
use workflow_trigger_engine::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay(args) => cli::replay::run(args).await,
        Command::Validate(args) => cli::validate::run(args).await,
    }
}
