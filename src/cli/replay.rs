//! Replay command - runs one scripted user session against stored workflows

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::{debug, info};

use super::fixture;
use crate::config::AppConfig;
use crate::domain::chat::{MessageKind, Sender};
use crate::domain::storage::{from_row, tables, Row, RowFilter, Storage};
use crate::domain::workflow::{AgentId, SessionContext, UserId};
use crate::domain::DomainError;
use crate::infrastructure::chat::{MessageRecord, StorageChatSession};
use crate::infrastructure::interface::ChannelHost;
use crate::infrastructure::reply::ReplyGeneratorFactory;
use crate::infrastructure::storage::{InMemoryStorage, StorageConfig, StorageFactory};
use crate::infrastructure::workflow::{
    ChatActionRunner, EngineCollaborators, StorageStepRepository, StorageWorkflowRepository,
    WorkflowSession,
};

/// Arguments for the replay command
#[derive(Args, Clone)]
pub struct ReplayArgs {
    /// JSON object of table name to rows used to seed storage
    #[arg(long)]
    pub fixture: PathBuf,

    /// JSON array of host events to publish, in order
    #[arg(long)]
    pub events: PathBuf,

    /// Agent whose workflows are loaded
    #[arg(long)]
    pub agent: String,

    /// User the session runs for
    #[arg(long)]
    pub user: String,
}

/// Run the replay command
pub async fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let config = super::init();

    let tables = fixture::load_tables(&args.fixture)?;
    let events = fixture::load_events(&args.events)?;
    let storage = seed_storage(&config, tables).await?;

    let agent_id = AgentId::from(args.agent);
    let user_id = UserId::from(args.user);
    let reply = ReplyGeneratorFactory::create(&config.reply)?;
    let chat = Arc::new(StorageChatSession::new(
        storage.clone(),
        agent_id.clone(),
        user_id.clone(),
    ));
    let steps = Arc::new(StorageStepRepository::new(storage.clone()));

    let collaborators = EngineCollaborators {
        steps: steps.clone(),
        workflows: Arc::new(StorageWorkflowRepository::new(storage.clone(), steps)),
        reply: reply.clone(),
        runner: Arc::new(ChatActionRunner::new(chat, reply)),
    };

    let host = ChannelHost::new(config.engine.event_buffer);
    let session = WorkflowSession::start(
        collaborators,
        &host,
        SessionContext::new(agent_id.clone(), user_id.clone()),
        config.engine.engine_config(),
    )
    .await?;

    // one event at a time, so the transcript is deterministic
    for (position, event) in events.into_iter().enumerate() {
        debug!(position, event = event.kind_name(), "Publishing host event");
        host.publish(event);
        session.wait_idle(position as u64 + 1).await;
    }

    let stats = session.end().await;
    info!(
        events = stats.events_handled,
        triggers = stats.triggers,
        fired = stats.report.fired().len(),
        "Replay finished"
    );

    print_transcript(storage.as_ref(), &agent_id, &user_id).await?;
    for (step_id, outcome) in &stats.report.outcomes {
        println!("# {} {}", step_id, serde_json::to_string(outcome)?);
    }

    Ok(())
}

async fn seed_storage(
    config: &AppConfig,
    tables: HashMap<String, Vec<Row>>,
) -> anyhow::Result<Arc<dyn Storage>> {
    let storage_config = config.storage.storage_config()?;

    if let StorageConfig::InMemory = storage_config {
        return Ok(Arc::new(InMemoryStorage::with_tables(tables)));
    }

    let storage = StorageFactory::create(&storage_config).await?;
    for (table, rows) in tables {
        for row in rows {
            match storage.create(&table, row).await {
                Ok(_) | Err(DomainError::Conflict { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(storage)
}

async fn print_transcript(
    storage: &dyn Storage,
    agent_id: &AgentId,
    user_id: &UserId,
) -> anyhow::Result<()> {
    let filter = RowFilter::new()
        .eq("agent_id", agent_id.as_str())
        .eq("user_id", user_id.as_str());

    for row in storage.get(tables::MESSAGES, &filter).await? {
        let record: MessageRecord = from_row(row)?;
        let content = record.decode_content();
        let sender = match record.sender {
            Sender::User => "user",
            Sender::Agent => "agent",
        };
        let kind = match content.kind {
            MessageKind::Text => "text",
            MessageKind::Error => "error",
        };

        println!("[{}:{}] {}", sender, kind, content.content);
    }

    Ok(())
}
