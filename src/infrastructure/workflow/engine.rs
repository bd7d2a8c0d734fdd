//! Execution engine: decides whether steps may fire and runs them one at a time

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::reply::ReplyGenerator;
use crate::domain::workflow::{
    ActionRunner, Condition, SessionContext, Step, StepId, StepOutcome, StepRepository, Trigger,
    TriggerReport, TriggerSource, Workflow, WorkflowError, WorkflowExecutor, WorkflowRepository,
};
use crate::infrastructure::metrics;

use super::evaluator::{ConditionEvaluator, EvaluationContext};

/// Configuration for the execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single agent judgment
    pub judgment_timeout: Duration,

    /// Maximum dependency cascade rounds after one trigger (prevents loops)
    pub max_cascade_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            judgment_timeout: Duration::from_millis(10_000),
            max_cascade_depth: 16,
        }
    }
}

/// Collaborators an engine is built from
#[derive(Clone)]
pub struct EngineCollaborators {
    pub steps: Arc<dyn StepRepository>,
    pub workflows: Arc<dyn WorkflowRepository>,
    pub reply: Arc<dyn ReplyGenerator>,
    pub runner: Arc<dyn ActionRunner>,
}

/// Per-session execution engine
///
/// Owns the execution lock: at most one step's actions run at any time, and a
/// step that becomes runnable while another run holds the lock is dropped for
/// that trigger (logged and counted), not queued.
pub struct ExecutionEngine {
    steps: Vec<Step>,
    repository: Arc<dyn StepRepository>,
    evaluator: ConditionEvaluator,
    runner: Arc<dyn ActionRunner>,
    session: SessionContext,
    config: EngineConfig,
    execution_lock: Mutex<()>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("steps", &self.steps.len())
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    /// Builds an engine over the active steps of the active workflows
    pub fn new(
        workflows: &[Workflow],
        collaborators: EngineCollaborators,
        session: SessionContext,
        config: EngineConfig,
    ) -> Self {
        let active: Vec<&Workflow> = workflows.iter().filter(|w| w.is_active()).collect();

        let mut steps = Vec::new();
        for workflow in &active {
            let mut workflow_steps: Vec<Step> = workflow.active_steps().cloned().collect();
            workflow_steps.sort_by_key(|s| s.index);
            steps.extend(workflow_steps);
        }

        let evaluator = ConditionEvaluator::new(
            collaborators.steps.clone(),
            collaborators.workflows,
            collaborators.reply,
            config.judgment_timeout,
        )
        .with_workflows(active.iter().copied());

        debug!(
            workflows = active.len(),
            steps = steps.len(),
            user_id = %session.user_id,
            "Execution engine initialized"
        );

        Self {
            steps,
            repository: collaborators.steps,
            evaluator,
            runner: collaborators.runner,
            session,
            config,
            execution_lock: Mutex::new(()),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Steps a trigger is evaluated against, with any element-carried conditions
    fn candidates<'a>(&'a self, trigger: &'a Trigger) -> Vec<(&'a Step, &'a [Condition])> {
        match (&trigger.source, &trigger.element) {
            (TriggerSource::Ui(event), None) if event.is_broadcast() => self
                .steps
                .iter()
                .filter(|s| s.declares_ui_event(*event) || s.is_passive())
                .map(|s| (s, &[][..]))
                .collect(),
            (TriggerSource::Ui(event), Some(element)) => match self.step(&element.step_id) {
                Some(step) => vec![(step, element.conditions.as_slice())],
                None => {
                    let error = WorkflowError::dangling_reference("step", element.step_id.as_str());
                    warn!(event = %event, error = %error, "Element is tagged with an unknown step");
                    Vec::new()
                }
            },
            (TriggerSource::Ui(event), None) => {
                warn!(event = %event, "Element event without an element target");
                Vec::new()
            }
            (TriggerSource::Dependency(step_id), _) => self.dependents(step_id),
        }
    }

    fn dependents(&self, step_id: &StepId) -> Vec<(&Step, &[Condition])> {
        let Some(fired) = self.step(step_id) else {
            return self
                .steps
                .iter()
                .filter(|s| s.conditions.iter().any(|c| c.depends_on_step(step_id)))
                .map(|s| (s, &[][..]))
                .collect();
        };

        self.steps
            .iter()
            .filter(|s| s.id != fired.id && s.depends_on(&fired.id, &fired.workflow_id))
            .map(|s| (s, &[][..]))
            .collect()
    }

    /// Evaluates one candidate and runs it if allowed
    async fn consider(
        &self,
        step: &Step,
        element_conditions: &[Condition],
        source: &TriggerSource,
    ) -> StepOutcome {
        if let TriggerSource::Ui(event) = source {
            let declared = step.declares_ui_event(*event)
                || element_conditions.iter().any(|c| c.mentions_ui_event(*event));
            if !event.is_broadcast() && !declared {
                debug!(step_id = %step.id, event = %event, "Step does not listen for this event");
                return StepOutcome::ConditionsUnmet;
            }
        }

        if !step.is_repeatable {
            match self.repository.has_session(&step.id, &self.session.user_id).await {
                Ok(true) => return StepOutcome::AlreadyFired,
                Ok(false) => {}
                Err(e) => {
                    warn!(step_id = %step.id, error = %e, "Session lookup failed, skipping step");
                    return StepOutcome::ConditionsUnmet;
                }
            }
        }

        let context = EvaluationContext {
            source: source.clone(),
            session: self.session.clone(),
        };

        let satisfied = match self.evaluator.evaluate_all(element_conditions, &context).await {
            Ok(true) => self.evaluator.evaluate_all(&step.conditions, &context).await,
            other => other,
        };

        match satisfied {
            Ok(true) => self.run(step).await,
            Ok(false) => StepOutcome::ConditionsUnmet,
            Err(e) => {
                warn!(step_id = %step.id, error = %e, "Condition evaluation failed, skipping step");
                StepOutcome::ConditionsUnmet
            }
        }
    }

    /// Runs a step under the execution lock
    ///
    /// The session row is written before any action executes, so a failure
    /// mid-sequence still leaves the step recorded as fired.
    pub async fn run(&self, step: &Step) -> StepOutcome {
        let Ok(_guard) = self.execution_lock.try_lock() else {
            warn!(step_id = %step.id, "Another step is running, dropping trigger");
            return StepOutcome::Dropped;
        };

        if !step.is_repeatable {
            match self.repository.has_session(&step.id, &self.session.user_id).await {
                Ok(true) => return StepOutcome::AlreadyFired,
                Ok(false) => {}
                Err(e) => {
                    warn!(step_id = %step.id, error = %e, "Session re-check failed, not running step");
                    return StepOutcome::NotRecorded;
                }
            }
        }

        if let Err(e) = self
            .repository
            .record_session(&step.id, &self.session.user_id, &self.session.agent_id)
            .await
        {
            warn!(step_id = %step.id, error = %e, "Failed to record step session, not running actions");
            return StepOutcome::NotRecorded;
        }

        info!(step_id = %step.id, name = %step.name, user_id = %self.session.user_id, "Step fired");

        let started = Instant::now();
        let outcome = match self.runner.run_actions(step, &self.session).await {
            Ok(()) => StepOutcome::Fired,
            Err(e) => {
                error!(step_id = %step.id, error = %e, "Step actions failed");
                StepOutcome::FiredWithError
            }
        };
        metrics::record_step_run(started.elapsed());

        outcome
    }

    async fn evaluate_round(
        &self,
        candidates: Vec<(&Step, &[Condition])>,
        source: &TriggerSource,
        report: &mut TriggerReport,
    ) -> Vec<StepId> {
        let mut fired = Vec::new();
        for (step, element_conditions) in candidates {
            let outcome = self.consider(step, element_conditions, source).await;
            metrics::record_step_outcome(outcome);
            report.push(step.id.clone(), outcome);

            if outcome.fired() {
                fired.push(step.id.clone());
            }
        }
        fired
    }

    /// Re-evaluates dependents of freshly fired steps, bounded by `max_cascade_depth`
    ///
    /// A step runs at most once per trigger: steps that already fired are not
    /// candidates again, though their own dependents still cascade.
    async fn cascade(&self, mut fired: Vec<StepId>, report: &mut TriggerReport) {
        let mut ran: HashSet<StepId> = fired.iter().cloned().collect();

        for depth in 1..=self.config.max_cascade_depth {
            if fired.is_empty() {
                return;
            }

            let mut next = Vec::new();
            let mut considered = HashSet::new();
            for step_id in &fired {
                let source = TriggerSource::Dependency(step_id.clone());
                let candidates: Vec<_> = self
                    .dependents(step_id)
                    .into_iter()
                    .filter(|(step, _)| !ran.contains(&step.id) && considered.insert(step.id.clone()))
                    .collect();

                if !candidates.is_empty() {
                    debug!(step_id = %step_id, depth, dependents = candidates.len(), "Cascading");
                }
                next.extend(self.evaluate_round(candidates, &source, report).await);
            }
            ran.extend(next.iter().cloned());
            fired = next;
        }

        if !fired.is_empty() {
            warn!(
                max_depth = self.config.max_cascade_depth,
                "Dependency cascade depth exhausted"
            );
        }
    }
}

#[async_trait]
impl WorkflowExecutor for ExecutionEngine {
    async fn trigger(&self, trigger: Trigger) -> Result<TriggerReport, WorkflowError> {
        metrics::record_trigger(&trigger.source);
        debug!(source = %trigger.source, "Trigger received");

        let mut report = TriggerReport::default();
        let candidates = self.candidates(&trigger);
        let fired = self.evaluate_round(candidates, &trigger.source, &mut report).await;
        self.cascade(fired, &mut report).await;

        Ok(report)
    }
}
