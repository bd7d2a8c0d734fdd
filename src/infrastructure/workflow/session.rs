//! Workflow session: one user's engine plus its live host subscription

use std::sync::Arc;

use tracing::info;

use crate::domain::interface::HostInterface;
use crate::domain::workflow::{SessionContext, WorkflowError};
use crate::infrastructure::interface::{DispatcherHandle, DispatcherStats, DispatcherStatus, TriggerDispatcher};

use super::engine::{EngineCollaborators, EngineConfig, ExecutionEngine};

/// A running session
///
/// Workflows are loaded once at start. Ending or dropping the session
/// unsubscribes from the host; runs already in flight are allowed to finish.
#[derive(Debug)]
pub struct WorkflowSession {
    engine: Arc<ExecutionEngine>,
    dispatcher: DispatcherHandle,
}

impl WorkflowSession {
    /// Loads the agent's workflows and starts listening to the host
    pub async fn start(
        collaborators: EngineCollaborators,
        host: &dyn HostInterface,
        session: SessionContext,
        config: EngineConfig,
    ) -> Result<Self, WorkflowError> {
        let workflows = collaborators.workflows.list_by_agent(&session.agent_id).await?;

        let engine = Arc::new(ExecutionEngine::new(&workflows, collaborators, session, config));
        let dispatcher = TriggerDispatcher::spawn(engine.clone(), host.subscribe());

        info!(
            agent_id = %engine.session().agent_id,
            user_id = %engine.session().user_id,
            workflows = workflows.len(),
            steps = engine.steps().len(),
            "Workflow session started"
        );

        Ok(Self { engine, dispatcher })
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    pub fn status(&self) -> DispatcherStatus {
        self.dispatcher.status()
    }

    /// Waits until `events` host events were handled and every trigger finished
    pub async fn wait_idle(&self, events: u64) {
        self.dispatcher.wait_idle(events).await;
    }

    pub async fn end(self) -> DispatcherStats {
        let stats = self.dispatcher.shutdown().await;
        info!(
            user_id = %self.engine.session().user_id,
            events = stats.events_handled,
            fired = stats.report.fired().len(),
            "Workflow session ended"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::{MessageKind, Sender};
    use crate::domain::interface::{ElementId, ElementNode, HostEvent};
    use crate::domain::reply::{MockReplyGenerator, Reply};
    use crate::domain::storage::mock::MockStorage;
    use crate::domain::storage::{tables, Row};
    use crate::domain::workflow::{
        Action, Condition, PayloadEncoding, Step, StepOutcome, StepRecord, UiEvent,
    };
    use crate::domain::DomainError;
    use crate::infrastructure::chat::InMemoryChatSession;
    use crate::infrastructure::interface::ChannelHost;
    use crate::infrastructure::workflow::{
        ChatActionRunner, StorageStepRepository, StorageWorkflowRepository,
    };
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn step_row(step: Step) -> Row {
        crate::domain::storage::to_row(&StepRecord::from_step(&step, PayloadEncoding::Legacy)).unwrap()
    }

    fn seeded_storage() -> MockStorage {
        MockStorage::new()
            .with_row(tables::WORKFLOWS, row(json!({"id": "wf-1", "name": "Onboarding"})))
            .with_row(tables::AGENT_WORKFLOWS, row(json!({"agent_id": "a1", "workflow_id": "wf-1"})))
            .with_row(
                tables::STEPS,
                step_row(
                    Step::new("S1", "wf-1", "Welcome")
                        .with_condition(Condition::Always)
                        .with_action(Action::text("Welcome!")),
                ),
            )
            .with_row(
                tables::STEPS,
                step_row(
                    Step::new("S2", "wf-1", "Tip")
                        .with_index(1)
                        .repeatable()
                        .with_condition(Condition::ui_event(UiEvent::OnClicked))
                        .with_action(Action::agent("Give a tip")),
                ),
            )
    }

    async fn start(
        storage: MockStorage,
        reply: MockReplyGenerator,
        host: &ChannelHost,
    ) -> (Arc<MockStorage>, Arc<InMemoryChatSession>, WorkflowSession) {
        let storage = Arc::new(storage);
        let chat = Arc::new(InMemoryChatSession::new());
        let reply = Arc::new(reply);
        let steps = Arc::new(StorageStepRepository::new(storage.clone()));

        let collaborators = EngineCollaborators {
            steps: steps.clone(),
            workflows: Arc::new(StorageWorkflowRepository::new(storage.clone(), steps)),
            reply: reply.clone(),
            runner: Arc::new(ChatActionRunner::new(chat.clone(), reply)),
        };

        let session = WorkflowSession::start(
            collaborators,
            host,
            SessionContext::new("a1", "u1"),
            EngineConfig::default(),
        )
        .await
        .unwrap();

        (storage, chat, session)
    }

    fn tip_reply() -> MockReplyGenerator {
        let mut reply = MockReplyGenerator::new();
        let counter = std::sync::atomic::AtomicUsize::new(0);
        reply.expect_generate().returning(move |_, _| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            Ok(Reply::new(format!("tip {}", n)))
        });
        reply
    }

    fn texts(chat: &InMemoryChatSession) -> Vec<String> {
        chat.messages().into_iter().map(|m| m.content).collect()
    }

    #[tokio::test]
    async fn test_page_load_welcome_fires_once() {
        let host = ChannelHost::new(16);
        let (storage, chat, session) = start(seeded_storage(), MockReplyGenerator::new(), &host).await;

        host.publish(HostEvent::Ready);
        session.wait_idle(1).await;
        host.publish(HostEvent::Ready);
        session.wait_idle(2).await;

        assert_eq!(texts(&chat), vec!["Welcome!"]);
        let sessions: Vec<Row> = storage.rows(tables::STEP_SESSIONS);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["step_id"], "S1");

        let stats = session.end().await;
        assert_eq!(stats.report.count(StepOutcome::Fired), 1);
        assert_eq!(stats.report.count(StepOutcome::AlreadyFired), 1);
    }

    #[tokio::test]
    async fn test_tagged_element_clicks_fire_repeatable_step() {
        let host = ChannelHost::new(16);
        let (_, chat, session) = start(seeded_storage(), tip_reply(), &host).await;

        host.publish(HostEvent::Mounted {
            nodes: vec![ElementNode::new("E").tagged("S2", &[])],
        });
        for n in 0..3 {
            host.publish(HostEvent::Click {
                target: ElementId::from("E"),
            });
            session.wait_idle(2 + n).await;
        }

        assert_eq!(texts(&chat), vec!["tip 1", "tip 2", "tip 3"]);
        assert!(chat.messages().iter().all(|m| m.sender == Sender::Agent));
        session.end().await;
    }

    #[tokio::test]
    async fn test_end_stops_dispatching() {
        let host = ChannelHost::new(16);
        let (_, chat, session) = start(seeded_storage(), MockReplyGenerator::new(), &host).await;
        assert_eq!(host.subscriber_count(), 1);

        session.end().await;
        assert_eq!(host.subscriber_count(), 0);

        host.publish(HostEvent::Ready);
        tokio::task::yield_now().await;
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_session_stops_dispatching() {
        let host = ChannelHost::new(16);
        let (storage, chat, session) = start(seeded_storage(), MockReplyGenerator::new(), &host).await;
        assert_eq!(host.subscriber_count(), 1);

        drop(session);
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while host.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(host.publish(HostEvent::Ready), 0);
        tokio::task::yield_now().await;
        assert!(chat.messages().is_empty());
        assert!(storage.rows(tables::STEP_SESSIONS).is_empty());
    }

    #[tokio::test]
    async fn test_reply_failure_surfaces_error_message() {
        let host = ChannelHost::new(16);
        let mut reply = MockReplyGenerator::new();
        reply
            .expect_generate()
            .returning(|_, _| Err(DomainError::provider("chat", "unavailable")));
        let (storage, chat, session) = start(seeded_storage(), reply, &host).await;

        host.publish(HostEvent::Mounted {
            nodes: vec![ElementNode::new("E").tagged("S2", &[])],
        });
        host.publish(HostEvent::Click {
            target: ElementId::from("E"),
        });
        session.wait_idle(2).await;

        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Error);
        assert_eq!(storage.rows(tables::STEP_SESSIONS).len(), 1);
        session.end().await;
    }

    #[tokio::test]
    async fn test_start_fails_when_storage_is_down() {
        let host = ChannelHost::new(16);
        let storage = Arc::new(MockStorage::new().with_error("down"));
        let chat = Arc::new(InMemoryChatSession::new());
        let reply = Arc::new(MockReplyGenerator::new());
        let steps = Arc::new(StorageStepRepository::new(storage.clone()));

        let result = WorkflowSession::start(
            EngineCollaborators {
                steps: steps.clone(),
                workflows: Arc::new(StorageWorkflowRepository::new(storage, steps)),
                reply: reply.clone(),
                runner: Arc::new(ChatActionRunner::new(chat, reply)),
            },
            &host,
            SessionContext::new("a1", "u1"),
            EngineConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(WorkflowError::Collaborator(_))));
        assert_eq!(host.subscriber_count(), 0);
    }
}
