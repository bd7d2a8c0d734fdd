//! Validate command - checks stored steps for payloads the engine would drop

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::fixture;
use crate::domain::storage::{from_row, tables, Row};
use crate::domain::workflow::{
    decode_step, AgentWorkflowRecord, Condition, StepRecord, WorkflowError, WorkflowRecord,
};

/// Arguments for the validate command
#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// JSON object of table name to rows
    #[arg(long)]
    pub fixture: PathBuf,
}

/// One problem found in the stored data
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub table: &'static str,
    pub id: String,
    pub message: String,
}

impl Finding {
    fn new(table: &'static str, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table,
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Run the validate command
pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    super::init();

    let tables = fixture::load_tables(&args.fixture)?;
    let findings = validate_tables(&tables);

    for finding in &findings {
        println!("{} {}: {}", finding.table, finding.id, finding.message);
    }
    info!(findings = findings.len(), "Validation finished");

    if !findings.is_empty() {
        anyhow::bail!("{} problem(s) found in {}", findings.len(), args.fixture.display());
    }
    Ok(())
}

/// Checks every step, workflow and assignment row
pub fn validate_tables(tables: &HashMap<String, Vec<Row>>) -> Vec<Finding> {
    let rows = |table: &str| tables.get(table).cloned().unwrap_or_default();
    let mut findings = Vec::new();

    let mut workflow_ids = HashSet::new();
    for row in rows(tables::WORKFLOWS) {
        match from_row::<WorkflowRecord>(row) {
            Ok(record) => {
                workflow_ids.insert(record.id);
            }
            Err(e) => findings.push(Finding::new(tables::WORKFLOWS, "?", e.to_string())),
        }
    }

    let mut steps = Vec::new();
    for row in rows(tables::STEPS) {
        match from_row::<StepRecord>(row) {
            Ok(record) => steps.push(decode_step(record)),
            Err(e) => findings.push(Finding::new(tables::STEPS, "?", e.to_string())),
        }
    }
    let step_ids: HashSet<String> = steps.iter().map(|d| d.step.id.to_string()).collect();

    for decoded in &steps {
        let id = decoded.step.id.as_str();

        if !workflow_ids.contains(decoded.step.workflow_id.as_str()) {
            let error = WorkflowError::dangling_reference("workflow", decoded.step.workflow_id.as_str());
            findings.push(Finding::new(tables::STEPS, id, error.to_string()));
        }
        for fragment in &decoded.dropped_conditions {
            findings.push(Finding::new(tables::STEPS, id, format!("unrecognized condition {}", fragment)));
        }
        for fragment in &decoded.dropped_actions {
            findings.push(Finding::new(tables::STEPS, id, format!("unrecognized action {}", fragment)));
        }

        for condition in &decoded.step.conditions {
            for (kind, reference) in references(condition) {
                let known = match kind {
                    "step" => step_ids.contains(&reference),
                    _ => workflow_ids.contains(&reference),
                };
                if !known {
                    let error = WorkflowError::dangling_reference(kind, &reference);
                    findings.push(Finding::new(tables::STEPS, id, error.to_string()));
                }
            }
        }
    }

    for row in rows(tables::AGENT_WORKFLOWS) {
        match from_row::<AgentWorkflowRecord>(row) {
            Ok(assignment) if !workflow_ids.contains(assignment.workflow_id.as_str()) => {
                let error = WorkflowError::dangling_reference("workflow", assignment.workflow_id.as_str());
                findings.push(Finding::new(
                    tables::AGENT_WORKFLOWS,
                    assignment.agent_id.to_string(),
                    error.to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => findings.push(Finding::new(tables::AGENT_WORKFLOWS, "?", e.to_string())),
        }
    }

    findings
}

/// Step and workflow ids a condition tree points at
fn references(condition: &Condition) -> Vec<(&'static str, String)> {
    match condition {
        Condition::Step { step_id } => vec![("step", step_id.to_string())],
        Condition::JudgedByAgent(judged) => vec![("step", judged.step_id.to_string())],
        Condition::Workflow { workflow_id } => vec![("workflow", workflow_id.to_string())],
        Condition::And { conditions } | Condition::Or { conditions } => {
            conditions.iter().flat_map(references).collect()
        }
        Condition::Always | Condition::UiEvent { .. } => Vec::new(),
    }
}
