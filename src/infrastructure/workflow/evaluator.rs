//! Condition evaluation against session state

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::domain::reply::{ReplyContext, ReplyGenerator};
use crate::domain::workflow::{
    Condition, JudgedByAgent, SessionContext, StepId, StepRepository, TriggerSource, Workflow,
    WorkflowError, WorkflowId, WorkflowRepository,
};
use crate::infrastructure::metrics;

/// What a condition is evaluated against
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub source: TriggerSource,
    pub session: SessionContext,
}

/// Evaluates step conditions for one user session
pub struct ConditionEvaluator {
    steps: Arc<dyn StepRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    reply: Arc<dyn ReplyGenerator>,
    judgment_timeout: Duration,
    /// Active step ids of the workflows loaded into the engine
    known_workflows: HashMap<WorkflowId, Vec<StepId>>,
}

impl std::fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("judgment_timeout", &self.judgment_timeout)
            .field("known_workflows", &self.known_workflows.len())
            .finish_non_exhaustive()
    }
}

impl ConditionEvaluator {
    pub fn new(
        steps: Arc<dyn StepRepository>,
        workflows: Arc<dyn WorkflowRepository>,
        reply: Arc<dyn ReplyGenerator>,
        judgment_timeout: Duration,
    ) -> Self {
        Self {
            steps,
            workflows,
            reply,
            judgment_timeout,
            known_workflows: HashMap::new(),
        }
    }

    /// Registers already-loaded workflows so completion checks skip the repository
    pub fn with_workflows<'a>(mut self, workflows: impl IntoIterator<Item = &'a Workflow>) -> Self {
        for workflow in workflows {
            let ids = workflow.active_steps().map(|s| s.id.clone()).collect();
            self.known_workflows.insert(workflow.id.clone(), ids);
        }
        self
    }

    /// Evaluates a flat list as a logical AND in declared order, short-circuiting
    pub async fn evaluate_all(
        &self,
        conditions: &[Condition],
        context: &EvaluationContext,
    ) -> Result<bool, WorkflowError> {
        for condition in conditions {
            if !self.evaluate(condition, context).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn evaluate<'a>(
        &'a self,
        condition: &'a Condition,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, Result<bool, WorkflowError>> {
        async move {
            match condition {
                Condition::Always => Ok(true),
                Condition::Step { step_id } => {
                    self.steps.has_session(step_id, &context.session.user_id).await
                }
                Condition::Workflow { workflow_id } => {
                    self.workflow_complete(workflow_id, context).await
                }
                Condition::UiEvent { event } => Ok(context.source.ui_event() == Some(*event)),
                Condition::JudgedByAgent(judged) => Ok(self.judge(judged, context).await),
                Condition::And { conditions } => self.evaluate_all(conditions, context).await,
                Condition::Or { conditions } => {
                    for condition in conditions {
                        if self.evaluate(condition, context).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            }
        }
        .boxed()
    }

    /// A workflow is complete once every active step has a session; unknown or
    /// empty workflows never are
    async fn workflow_complete(
        &self,
        workflow_id: &WorkflowId,
        context: &EvaluationContext,
    ) -> Result<bool, WorkflowError> {
        let step_ids = match self.known_workflows.get(workflow_id) {
            Some(ids) => ids.clone(),
            None => match self.workflows.get_with_steps(workflow_id).await? {
                Some(workflow) => workflow.active_steps().map(|s| s.id.clone()).collect(),
                None => {
                    let error = WorkflowError::dangling_reference("workflow", workflow_id.as_str());
                    warn!(error = %error, "Workflow condition can never be satisfied");
                    return Ok(false);
                }
            },
        };

        if step_ids.is_empty() {
            return Ok(false);
        }

        for step_id in &step_ids {
            if !self.steps.has_session(step_id, &context.session.user_id).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Fail-closed wrapper around [`Self::judgment`]
    async fn judge(&self, judged: &JudgedByAgent, context: &EvaluationContext) -> bool {
        match self.judgment(judged, context).await {
            Ok(verdict) => verdict,
            Err(e) => {
                let reason = match e {
                    WorkflowError::JudgmentTimeout { .. } => "timeout",
                    WorkflowError::JudgmentAmbiguous(_) => "ambiguous",
                    _ => "collaborator",
                };
                metrics::record_judgment_failure(reason);
                warn!(step_id = %judged.step_id, error = %e, "Agent judgment failed closed");
                false
            }
        }
    }

    /// Asks the judging agent about a prior step; a step that never fired is not judged
    pub async fn judgment(
        &self,
        judged: &JudgedByAgent,
        context: &EvaluationContext,
    ) -> Result<bool, WorkflowError> {
        if !self
            .steps
            .has_session(&judged.step_id, &context.session.user_id)
            .await?
        {
            debug!(step_id = %judged.step_id, "Judged step has not fired yet");
            return Ok(false);
        }

        let reply_context = ReplyContext::new(judged.agent_id.clone(), context.session.user_id.clone())
            .for_step(judged.step_id.clone());

        let reply = tokio::time::timeout(
            self.judgment_timeout,
            self.reply.generate(&judged.prompt, &reply_context),
        )
        .await
        .map_err(|_| WorkflowError::judgment_timeout(self.judgment_timeout.as_millis() as u64))?
        .map_err(|e| WorkflowError::judgment_ambiguous(e.to_string()))?;

        parse_verdict(&reply.reply).ok_or_else(|| {
            WorkflowError::judgment_ambiguous(format!("Not a boolean answer: {:?}", reply.reply))
        })
    }
}

/// Reads a yes/no style answer from the first word of a reply
pub fn parse_verdict(answer: &str) -> Option<bool> {
    let first = answer
        .trim()
        .split(|c: char| !c.is_alphanumeric())
        .find(|word| !word.is_empty())?
        .to_lowercase();

    match first.as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}
