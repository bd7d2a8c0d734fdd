//! Trigger dispatcher: turns host events into engine triggers

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use crate::domain::interface::{ElementId, HostEvent};
use crate::domain::workflow::{Trigger, TriggerReport, UiEvent, WorkflowError, WorkflowExecutor};

use super::registry::ElementRegistry;

/// Live progress of a dispatcher, published after every handled event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStatus {
    /// Host events received, including ones lost to lag
    pub events_handled: u64,
    /// Triggers handed to the engine that have not finished yet
    pub in_flight: usize,
}

/// Totals returned when a dispatcher shuts down
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatcherStats {
    pub events_handled: u64,
    pub triggers: u64,
    pub lagged: u64,
    pub failed: u64,
    /// Outcomes of every trigger, in completion order
    pub report: TriggerReport,
}

/// Entry point for spawning dispatchers
pub struct TriggerDispatcher;

impl TriggerDispatcher {
    /// Spawns the dispatch loop over a host subscription
    ///
    /// The registry is owned by the loop and only touched by mount/unmount events.
    /// Click, hover, ready and revisit events each spawn one engine trigger; the
    /// engine's execution lock decides which of them may run.
    pub fn spawn(
        executor: Arc<dyn WorkflowExecutor>,
        events: broadcast::Receiver<HostEvent>,
    ) -> DispatcherHandle {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(DispatcherStatus::default());

        let dispatch = DispatchLoop {
            executor,
            registry: ElementRegistry::new(),
            in_flight: JoinSet::new(),
            cancel: cancel.clone(),
            status: status_tx,
            stats: DispatcherStats::default(),
        };

        DispatcherHandle {
            cancel: cancel.drop_guard(),
            status: status_rx,
            task: tokio::spawn(dispatch.run(events)),
        }
    }
}

/// Handle to a running dispatcher
///
/// Dropping the handle cancels the loop, which unsubscribes from the host.
#[derive(Debug)]
pub struct DispatcherHandle {
    cancel: DropGuard,
    status: watch::Receiver<DispatcherStatus>,
    task: JoinHandle<DispatcherStats>,
}

impl DispatcherHandle {
    pub fn status(&self) -> DispatcherStatus {
        *self.status.borrow()
    }

    /// Waits until `events` host events were handled and no trigger is in flight
    pub async fn wait_idle(&self, events: u64) {
        let mut status = self.status.clone();
        let _ = status
            .wait_for(|s| s.events_handled >= events && s.in_flight == 0)
            .await;
    }

    /// Unsubscribes from the host and lets in-flight triggers finish
    pub async fn shutdown(self) -> DispatcherStats {
        self.cancel.disarm().cancel();

        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Trigger dispatcher task failed");
                DispatcherStats::default()
            }
        }
    }
}

struct DispatchLoop {
    executor: Arc<dyn WorkflowExecutor>,
    registry: ElementRegistry,
    in_flight: JoinSet<Result<TriggerReport, WorkflowError>>,
    cancel: CancellationToken,
    status: watch::Sender<DispatcherStatus>,
    stats: DispatcherStats,
}

impl DispatchLoop {
    async fn run(mut self, mut events: broadcast::Receiver<HostEvent>) -> DispatcherStats {
        debug!("Trigger dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Trigger dispatcher cancelled");
                    break;
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.finish(joined);
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        self.stats.events_handled += 1;
                        self.handle(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dispatcher lagged behind the host, events lost");
                        self.stats.lagged += skipped;
                        self.stats.events_handled += skipped;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Host closed its event stream");
                        break;
                    }
                },
            }
            self.publish_status();
        }

        // unsubscribe before draining so nothing new can be initiated
        drop(events);

        while let Some(joined) = self.in_flight.join_next().await {
            self.finish(joined);
        }
        self.status.send_replace(DispatcherStatus {
            events_handled: self.stats.events_handled,
            in_flight: 0,
        });

        info!(
            events = self.stats.events_handled,
            triggers = self.stats.triggers,
            fired = self.stats.report.fired().len(),
            "Trigger dispatcher stopped"
        );
        self.stats
    }

    fn handle(&mut self, event: HostEvent) {
        debug!(event = event.kind_name(), "Host event");

        match event {
            HostEvent::Mounted { nodes } => {
                for node in &nodes {
                    self.registry.mount(node);
                }
            }
            HostEvent::Unmounted { nodes } => {
                for node in &nodes {
                    self.registry.unmount(node);
                }
            }
            HostEvent::Click { target } => self.dispatch_element(UiEvent::OnClicked, &target),
            HostEvent::HoverEnter { target } => self.dispatch_element(UiEvent::OnHovered, &target),
            HostEvent::Ready => self.dispatch(Trigger::broadcast(UiEvent::OnPageLoad)),
            HostEvent::Revisited => self.dispatch(Trigger::broadcast(UiEvent::OnVisited)),
        }
    }

    fn dispatch_element(&mut self, event: UiEvent, target: &ElementId) {
        let Some(payload) = self.registry.get(target) else {
            debug!(element_id = %target, event = %event, "Element carries no step");
            return;
        };

        let trigger = Trigger::element(event, payload.step_id.clone(), payload.conditions.clone());
        self.dispatch(trigger);
    }

    fn dispatch(&mut self, trigger: Trigger) {
        self.stats.triggers += 1;
        let executor = self.executor.clone();
        self.in_flight.spawn(async move { executor.trigger(trigger).await });
    }

    fn finish(&mut self, joined: Result<Result<TriggerReport, WorkflowError>, JoinError>) {
        match joined {
            Ok(Ok(report)) => self.stats.report.extend(report),
            Ok(Err(e)) => {
                self.stats.failed += 1;
                warn!(error = %e, "Trigger failed");
            }
            Err(e) => {
                self.stats.failed += 1;
                error!(error = %e, "Trigger task panicked");
            }
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(DispatcherStatus {
            events_handled: self.stats.events_handled,
            in_flight: self.in_flight.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interface::{ElementNode, HostInterface};
    use crate::domain::workflow::{Condition, StepId, StepOutcome};
    use crate::infrastructure::interface::ChannelHost;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Executor that records triggers and reports every element step as fired
    #[derive(Default)]
    struct RecordingExecutor {
        triggers: Mutex<Vec<Trigger>>,
    }

    impl RecordingExecutor {
        fn triggers(&self) -> Vec<Trigger> {
            self.triggers.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkflowExecutor for RecordingExecutor {
        async fn trigger(&self, trigger: Trigger) -> Result<TriggerReport, WorkflowError> {
            let mut report = TriggerReport::default();
            if let Some(element) = &trigger.element {
                report.push(element.step_id.clone(), StepOutcome::Fired);
            }
            self.triggers.lock().unwrap().push(trigger);
            Ok(report)
        }
    }

    fn start() -> (ChannelHost, Arc<RecordingExecutor>, DispatcherHandle) {
        start_with_capacity(64)
    }

    fn start_with_capacity(capacity: usize) -> (ChannelHost, Arc<RecordingExecutor>, DispatcherHandle) {
        let host = ChannelHost::new(capacity);
        let executor = Arc::new(RecordingExecutor::default());
        let handle = TriggerDispatcher::spawn(executor.clone(), host.subscribe());
        (host, executor, handle)
    }

    #[tokio::test]
    async fn test_click_resolves_through_registry() {
        let (host, executor, handle) = start();

        host.publish(HostEvent::Mounted {
            nodes: vec![ElementNode::new("root").with_child(
                ElementNode::new("btn").tagged("s1", &[Condition::step("s0")]),
            )],
        });
        host.publish(HostEvent::Click {
            target: ElementId::from("btn"),
        });
        host.publish(HostEvent::HoverEnter {
            target: ElementId::from("btn"),
        });
        handle.wait_idle(3).await;

        let triggers = executor.triggers();
        assert_eq!(triggers.len(), 2);
        assert_eq!(
            triggers[0],
            Trigger::element(UiEvent::OnClicked, StepId::from("s1"), vec![Condition::step("s0")])
        );
        assert_eq!(triggers[1].source.ui_event(), Some(UiEvent::OnHovered));

        let stats = handle.shutdown().await;
        assert_eq!(stats.triggers, 2);
        assert_eq!(stats.report.count(StepOutcome::Fired), 2);
    }

    #[tokio::test]
    async fn test_untagged_and_unmounted_elements_do_not_trigger() {
        let (host, executor, handle) = start();

        host.publish(HostEvent::Mounted {
            nodes: vec![ElementNode::new("btn").tagged("s1", &[])],
        });
        host.publish(HostEvent::Click {
            target: ElementId::from("plain"),
        });
        host.publish(HostEvent::Unmounted {
            nodes: vec![ElementNode::new("btn")],
        });
        host.publish(HostEvent::Click {
            target: ElementId::from("btn"),
        });
        handle.wait_idle(4).await;

        assert!(executor.triggers().is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_lifecycle_events_broadcast() {
        let (host, executor, handle) = start();

        host.publish(HostEvent::Ready);
        host.publish(HostEvent::Revisited);
        handle.wait_idle(2).await;

        let triggers = executor.triggers();
        assert_eq!(triggers.len(), 2);
        assert!(triggers.iter().all(|t| t.element.is_none()));
        assert!(triggers.contains(&Trigger::broadcast(UiEvent::OnPageLoad)));
        assert!(triggers.contains(&Trigger::broadcast(UiEvent::OnVisited)));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_unsubscribes() {
        let (host, executor, handle) = start();
        assert_eq!(host.subscriber_count(), 1);

        let stats = handle.shutdown().await;
        assert_eq!(stats.events_handled, 0);
        assert_eq!(host.subscriber_count(), 0);

        assert_eq!(host.publish(HostEvent::Ready), 0);
        assert!(executor.triggers().is_empty());
    }

    #[tokio::test]
    async fn test_closed_host_keeps_finished_triggers() {
        let (host, _executor, handle) = start();
        host.publish(HostEvent::Ready);
        handle.wait_idle(1).await;
        drop(host);

        let stats = handle.shutdown().await;
        assert_eq!(stats.events_handled, 1);
        assert_eq!(stats.triggers, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_unsubscribes() {
        let (host, executor, handle) = start();
        assert_eq!(host.subscriber_count(), 1);

        drop(handle);
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while host.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(host.publish(HostEvent::Ready), 0);
        tokio::task::yield_now().await;
        assert!(executor.triggers().is_empty());
    }

    #[tokio::test]
    async fn test_lagged_events_are_counted_and_lost() {
        let (host, executor, handle) = start_with_capacity(1);

        // the loop has not been polled yet, so the mount is overwritten
        host.publish(HostEvent::Mounted {
            nodes: vec![ElementNode::new("btn").tagged("s1", &[])],
        });
        host.publish(HostEvent::Click {
            target: ElementId::from("btn"),
        });
        handle.wait_idle(2).await;

        assert!(executor.triggers().is_empty());

        let stats = handle.shutdown().await;
        assert_eq!(stats.lagged, 1);
        assert_eq!(stats.events_handled, 2);
        assert_eq!(stats.triggers, 0);
    }
}
