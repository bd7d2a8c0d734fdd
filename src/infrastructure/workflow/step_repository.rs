//! Storage-backed step repository

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::storage::{from_row, row_id, tables, to_row, RowFilter, Storage};
use crate::domain::workflow::{
    parse_step, AgentId, PayloadEncoding, Step, StepId, StepRecord, StepRepository, StepSession,
    UserId, WorkflowError, WorkflowId,
};

/// Step repository over the generic table store
#[derive(Debug)]
pub struct StorageStepRepository {
    storage: Arc<dyn Storage>,
    encoding: PayloadEncoding,
}

impl StorageStepRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            encoding: PayloadEncoding::default(),
        }
    }

    /// Writes payloads in the given encoding; reads accept every encoding
    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[async_trait]
impl StepRepository for StorageStepRepository {
    async fn list_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<Step>, WorkflowError> {
        let filter = RowFilter::new().eq("workflow_id", workflow_id.as_str());
        let rows = self.storage.get(tables::STEPS, &filter).await?;

        let mut steps = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row_id(&row).unwrap_or("<unknown>").to_string();
            match from_row::<StepRecord>(row) {
                Ok(record) => steps.push(parse_step(record)),
                Err(e) => warn!(step_id = %id, error = %e, "Skipping malformed step row"),
            }
        }

        steps.sort_by_key(|s| s.index);
        Ok(steps)
    }

    async fn replace_all(
        &self,
        workflow_id: &WorkflowId,
        steps: Vec<Step>,
    ) -> Result<Vec<Step>, WorkflowError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = steps.iter().find(|s| !seen.insert(s.id.clone())) {
            return Err(WorkflowError::invalid_payload(format!(
                "Duplicate step id '{}' in workflow '{}'",
                duplicate.id, workflow_id
            )));
        }

        let filter = RowFilter::new().eq("workflow_id", workflow_id.as_str());
        let existing: HashSet<String> = self
            .storage
            .get(tables::STEPS, &filter)
            .await?
            .iter()
            .filter_map(|row| row_id(row).map(str::to_string))
            .collect();

        for id in existing.iter().filter(|id| !seen.contains(&StepId::from(id.as_str()))) {
            debug!(step_id = %id, workflow_id = %workflow_id, "Deleting removed step");
            self.storage.delete(tables::STEPS, id).await?;
        }

        let mut stored = Vec::with_capacity(steps.len());
        for (position, mut step) in steps.into_iter().enumerate() {
            step.index = position as u32;
            step.workflow_id = workflow_id.clone();

            let row = to_row(&StepRecord::from_step(&step, self.encoding))?;
            if existing.contains(step.id.as_str()) {
                self.storage.update(tables::STEPS, step.id.as_str(), row).await?;
            } else {
                self.storage.create(tables::STEPS, row).await?;
            }
            stored.push(step);
        }

        Ok(stored)
    }

    async fn has_session(&self, step_id: &StepId, user_id: &UserId) -> Result<bool, WorkflowError> {
        let filter = RowFilter::new()
            .eq("step_id", step_id.as_str())
            .eq("user_id", user_id.as_str());

        Ok(self.storage.exists(tables::STEP_SESSIONS, &filter).await?)
    }

    async fn record_session(
        &self,
        step_id: &StepId,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<StepSession, WorkflowError> {
        let session = StepSession::new(step_id.clone(), user_id.clone(), agent_id.clone());
        self.storage
            .create(tables::STEP_SESSIONS, to_row(&session)?)
            .await?;

        Ok(session)
    }
}
