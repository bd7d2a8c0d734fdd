//! Storage-backed workflow repository

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::storage::{from_row, tables, to_row, RowFilter, Storage};
use crate::domain::workflow::{
    AgentId, AgentWorkflowRecord, StepRepository, Workflow, WorkflowError, WorkflowId,
    WorkflowRecord, WorkflowRepository,
};

/// Workflow repository joining `workflows`, `steps` and `agent_workflows`
pub struct StorageWorkflowRepository {
    storage: Arc<dyn Storage>,
    steps: Arc<dyn StepRepository>,
}

impl std::fmt::Debug for StorageWorkflowRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageWorkflowRepository")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl StorageWorkflowRepository {
    pub fn new(storage: Arc<dyn Storage>, steps: Arc<dyn StepRepository>) -> Self {
        Self { storage, steps }
    }
}

#[async_trait]
impl WorkflowRepository for StorageWorkflowRepository {
    async fn get_with_steps(&self, workflow_id: &WorkflowId) -> Result<Option<Workflow>, WorkflowError> {
        let Some(row) = self
            .storage
            .get_by_id(tables::WORKFLOWS, workflow_id.as_str())
            .await?
        else {
            debug!(workflow_id = %workflow_id, "Workflow not found");
            return Ok(None);
        };

        let record = match from_row::<WorkflowRecord>(row) {
            Ok(record) => record,
            Err(e) => {
                warn!(workflow_id = %workflow_id, error = %e, "Skipping malformed workflow row");
                return Ok(None);
            }
        };

        let steps = self.steps.list_by_workflow(workflow_id).await?;
        Ok(Some(record.into_workflow(steps)))
    }

    async fn list_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Workflow>, WorkflowError> {
        let filter = RowFilter::new().eq("agent_id", agent_id.as_str());
        let assignments = self.storage.get(tables::AGENT_WORKFLOWS, &filter).await?;

        let mut seen = HashSet::new();
        let mut workflows = Vec::new();

        for row in assignments {
            let assignment = match from_row::<AgentWorkflowRecord>(row) {
                Ok(assignment) => assignment,
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "Skipping malformed assignment row");
                    continue;
                }
            };

            if !seen.insert(assignment.workflow_id.clone()) {
                continue;
            }

            match self.get_with_steps(&assignment.workflow_id).await? {
                Some(workflow) => workflows.push(workflow),
                None => warn!(
                    agent_id = %agent_id,
                    workflow_id = %assignment.workflow_id,
                    "Agent is assigned a workflow that does not exist"
                ),
            }
        }

        Ok(workflows)
    }

    async fn save(&self, workflow: Workflow) -> Result<Workflow, WorkflowError> {
        let row = to_row(&WorkflowRecord::from_workflow(&workflow))?;
        let id = workflow.id.as_str();

        if self.storage.get_by_id(tables::WORKFLOWS, id).await?.is_some() {
            self.storage.update(tables::WORKFLOWS, id, row).await?;
        } else {
            self.storage.create(tables::WORKFLOWS, row).await?;
        }

        let steps = self.steps.replace_all(&workflow.id, workflow.steps).await?;
        Ok(Workflow { steps, ..workflow })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::mock::MockStorage;
    use crate::domain::storage::Row;
    use crate::domain::workflow::{Condition, Status, Step};
    use crate::infrastructure::workflow::StorageStepRepository;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn repository(storage: MockStorage) -> (Arc<MockStorage>, StorageWorkflowRepository) {
        let storage = Arc::new(storage);
        let steps = Arc::new(StorageStepRepository::new(storage.clone()));
        (storage.clone(), StorageWorkflowRepository::new(storage, steps))
    }

    #[tokio::test]
    async fn test_get_with_steps() {
        let (_, repo) = repository(
            MockStorage::new()
                .with_row(tables::WORKFLOWS, row(json!({"id": "wf-1", "name": "Onboarding"})))
                .with_row(
                    tables::STEPS,
                    row(json!({"id": "s1", "workflow_id": "wf-1", "conditions": "true"})),
                ),
        );

        let workflow = repo
            .get_with_steps(&WorkflowId::from("wf-1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(workflow.name, "Onboarding");
        assert_eq!(workflow.steps.len(), 1);
        assert_eq!(workflow.steps[0].conditions, vec![Condition::Always]);
    }

    #[tokio::test]
    async fn test_missing_workflow_is_none() {
        let (_, repo) = repository(MockStorage::new());
        let workflow = repo.get_with_steps(&WorkflowId::from("ghost")).await.unwrap();
        assert!(workflow.is_none());
    }

    #[tokio::test]
    async fn test_list_by_agent_skips_dangling_assignments() {
        let (_, repo) = repository(
            MockStorage::new()
                .with_row(tables::WORKFLOWS, row(json!({"id": "wf-1", "name": "One"})))
                .with_row(tables::WORKFLOWS, row(json!({"id": "wf-2", "name": "Two"})))
                .with_row(tables::AGENT_WORKFLOWS, row(json!({"agent_id": "a1", "workflow_id": "wf-2"})))
                .with_row(tables::AGENT_WORKFLOWS, row(json!({"agent_id": "a1", "workflow_id": "ghost"})))
                .with_row(tables::AGENT_WORKFLOWS, row(json!({"agent_id": "a1", "workflow_id": "wf-2"})))
                .with_row(tables::AGENT_WORKFLOWS, row(json!({"agent_id": "a2", "workflow_id": "wf-1"}))),
        );

        let workflows = repo.list_by_agent(&AgentId::from("a1")).await.unwrap();

        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].id.as_str(), "wf-2");
    }

    #[tokio::test]
    async fn test_save_upserts_and_replaces_steps() {
        let (storage, repo) = repository(MockStorage::new());

        let workflow = Workflow::new("wf-1", "Draft")
            .with_step(Step::new("a", "", "A"))
            .with_step(Step::new("b", "", "B"));
        repo.save(workflow).await.unwrap();

        let edited = Workflow::new("wf-1", "Published")
            .with_status(Status::Inactive)
            .with_step(Step::new("b", "", "B"));
        let saved = repo.save(edited).await.unwrap();

        assert_eq!(saved.steps.len(), 1);
        assert_eq!(storage.rows(tables::WORKFLOWS).len(), 1);
        assert_eq!(storage.rows(tables::STEPS).len(), 1);

        let loaded = repo
            .get_with_steps(&WorkflowId::from("wf-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "Published");
        assert!(!loaded.is_active());
        assert_eq!(loaded.steps[0].index, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_collaborator_error() {
        let (_, repo) = repository(MockStorage::new().with_error("down"));
        let result = repo.list_by_agent(&AgentId::from("a1")).await;
        assert!(matches!(result, Err(WorkflowError::Collaborator(_))));
    }
}
