//! Engine metrics recorded through the `metrics` facade
//!
//! No exporter is installed here; the host process decides where they go.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::domain::workflow::{StepOutcome, TriggerSource};

/// Record a trigger handed to the engine
pub fn record_trigger(source: &TriggerSource) {
    let kind = match source {
        TriggerSource::Ui(event) => event.as_str(),
        TriggerSource::Dependency(_) => "dependency",
    };
    counter!("workflow_triggers_total", "source" => kind).increment(1);
}

/// Record the outcome of one candidate step
pub fn record_step_outcome(outcome: StepOutcome) {
    let label = match outcome {
        StepOutcome::Fired => "fired",
        StepOutcome::FiredWithError => "fired_with_error",
        StepOutcome::Dropped => "dropped",
        StepOutcome::AlreadyFired => "already_fired",
        StepOutcome::ConditionsUnmet => "conditions_unmet",
        StepOutcome::NotRecorded => "not_recorded",
    };
    counter!("workflow_step_outcomes_total", "outcome" => label).increment(1);

    if outcome == StepOutcome::Dropped {
        counter!("workflow_triggers_dropped_total").increment(1);
    }
}

/// Record how long a step's action sequence took
pub fn record_step_run(duration: Duration) {
    histogram!("workflow_step_run_duration_seconds").record(duration.as_secs_f64());
}

/// Record an agent judgment that failed closed
pub fn record_judgment_failure(reason: &'static str) {
    counter!("workflow_judgment_failures_total", "reason" => reason).increment(1);
}

/// Record a failed action
pub fn record_action_failure(action: &'static str) {
    counter!("workflow_action_failures_total", "action" => action).increment(1);
}
