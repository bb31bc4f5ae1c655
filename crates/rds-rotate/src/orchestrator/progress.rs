//! Progress reporting abstractions for the orchestrator
//!
//! The pipeline reports every step it enters, so the same run logic can feed
//! logs in production and a recorder in tests.

use super::types::{RotationOutcome, RotationStep};
use tracing::{error, info};

/// Trait for reporting rotation progress
pub trait RotationProgressReporter: Send + Sync {
    /// A step is starting against `resource`
    fn report_step(&self, step: RotationStep, resource: &str);

    /// A step was skipped
    fn report_skip(&self, step: RotationStep, reason: &str);

    /// The run failed while in `step`
    fn report_failure(&self, step: RotationStep, error: &anyhow::Error);

    /// The run completed
    fn report_outcome(&self, outcome: &RotationOutcome);
}

/// Progress reporter that logs through `tracing`
#[derive(Debug, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl RotationProgressReporter for LogReporter {
    fn report_step(&self, step: RotationStep, resource: &str) {
        info!(step = %step, resource = %resource, "Rotation step");
    }

    fn report_skip(&self, step: RotationStep, reason: &str) {
        info!(step = %step, reason = %reason, "Skipping step");
    }

    fn report_failure(&self, step: RotationStep, error: &anyhow::Error) {
        error!(step = %step, error = %format!("{error:#}"), "Rotation failed");
    }

    fn report_outcome(&self, outcome: &RotationOutcome) {
        info!(
            deployment = %outcome.deployment,
            kind = %outcome.kind,
            current = %outcome.slots.current.instance_identifier,
            previous = %outcome.slots.previous.instance_identifier,
            endpoint = %outcome.endpoint,
            rollback = outcome.rollback,
            migrations = outcome.migrations_applied,
            dns_updated = outcome.dns_updated,
            retired = %outcome.retired,
            "Rotation complete"
        );
    }
}
