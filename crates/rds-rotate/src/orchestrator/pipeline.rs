//! The rotation run
//!
//! One run walks a fixed sequence of steps against a single deployment:
//! resolve identifiers, clear a colliding clone, clone and configure, migrate,
//! repoint DNS, retire yesterday's replica and persist the new slots. Steps
//! are strictly sequential; a failure aborts the run and leaves every
//! resource where the last completed step put it.

use super::progress::{LogReporter, RotationProgressReporter};
use super::safety::is_protected_resource;
use super::target::{CloneConfig, CloneTarget};
use super::types::{RetireOutcome, RotateOptions, RotationOutcome, RotationStep};
use crate::aws::RdsOperations;
use crate::dns::DnsUpdater;
use crate::error::RotateError;
use crate::migrate::MigrationRunner;
use crate::state::StateStore;
use crate::wait::WaitSettings;
use anyhow::{Context, Result};
use chrono::Utc;
use rds_rotate_common::{
    Clock, ResourceKind, ResourceStatus, RotationIdentifiers, Slot, SystemClock, next_slots,
};
use tracing::{info, warn};

/// Runs rotations with injected cloud, storage, DNS and SQL collaborators.
pub struct Rotator<R, S, D, M> {
    rds: R,
    store: S,
    dns: D,
    migrator: M,
    clock: Box<dyn Clock>,
    waits: WaitSettings,
    reporter: Box<dyn RotationProgressReporter>,
}

impl<R, S, D, M> Rotator<R, S, D, M>
where
    R: RdsOperations,
    S: StateStore,
    D: DnsUpdater,
    M: MigrationRunner,
{
    pub fn new(rds: R, store: S, dns: D, migrator: M) -> Self {
        Self {
            rds,
            store,
            dns,
            migrator,
            clock: Box::new(SystemClock::default()),
            waits: WaitSettings::default(),
            reporter: Box::new(LogReporter::new()),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_waits(mut self, waits: WaitSettings) -> Self {
        self.waits = waits;
        self
    }

    pub fn with_reporter(mut self, reporter: impl RotationProgressReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    fn enter(&self, current: &mut RotationStep, step: RotationStep, resource: &str) {
        *current = step;
        self.reporter.report_step(step, resource);
    }

    /// Rotate (or roll back) the named deployment.
    pub async fn rotate(&self, name: &str, options: RotateOptions) -> Result<RotationOutcome> {
        let mut step = RotationStep::Init;
        match self.run(name, options, &mut step).await {
            Ok(outcome) => {
                self.reporter.report_outcome(&outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.reporter.report_failure(step, &e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        name: &str,
        options: RotateOptions,
        step: &mut RotationStep,
    ) -> Result<RotationOutcome> {
        self.enter(step, RotationStep::Init, name);
        let mut state = self.store.load(name).await?;
        let rollback = options.rollback || state.rollback_flag;
        let source = state.validate(rollback).map_err(RotateError::Configuration)?;

        let (target_id, stale_id) = if rollback {
            (state.previous.instance_identifier.clone(), None)
        } else {
            let ids = RotationIdentifiers::compute(&source.base_identifier, self.clock.today());
            (ids.target, ids.stale)
        };
        info!(
            deployment = %name,
            kind = %source.kind,
            source = %source.source_identifier,
            target = %target_id,
            stale = ?stale_id,
            rollback,
            "Starting rotation"
        );

        let target = CloneTarget::new(source.kind, &target_id, &self.waits);
        let config = CloneConfig::from_document(&state, name, Utc::now());

        if rollback {
            self.check_rollback_target(&target).await?;
            self.reporter
                .report_skip(RotationStep::ClearingCollision, "rollback reuses the previous replica");
        } else if options.resume {
            self.reporter
                .report_skip(RotationStep::ClearingCollision, "resuming an existing clone");
        } else {
            self.enter(step, RotationStep::ClearingCollision, &target_id);
            if target_id == state.current.instance_identifier {
                warn!(target = %target_id, "Replacing the replica that is currently live");
            }
            self.clear_collision(&target)
                .await
                .with_context(|| format!("{step} failed for {target_id}"))?;
        }

        // Rollback only ever promotes the migrated previous replica
        if rollback {
            self.reporter
                .report_skip(RotationStep::Cloning, "rollback reuses the previous replica");
        } else {
            self.enter(step, RotationStep::Cloning, &target_id);
            target
                .ensure_created(&self.rds, &source.source_identifier, &config)
                .await
                .with_context(|| format!("{step} failed for {target_id}"))?;
        }

        self.enter(step, RotationStep::WaitingAvailable, &target_id);
        target
            .wait_available(&self.rds)
            .await
            .with_context(|| format!("{step} failed for {target_id}"))?;

        self.enter(step, RotationStep::Configuring, &target_id);
        target
            .apply_config(&self.rds, &config)
            .await
            .with_context(|| format!("{step} failed for {target_id}"))?;
        let connection = target
            .connection_info(&self.rds)
            .await
            .with_context(|| format!("{step} failed for {target_id}"))?;

        let migrations_applied = if rollback {
            self.reporter
                .report_skip(RotationStep::Migrating, "rollback replica already migrated");
            0
        } else if state.migration_queries.is_empty() {
            self.reporter
                .report_skip(RotationStep::Migrating, "no migration queries");
            0
        } else {
            self.enter(step, RotationStep::Migrating, &target_id);
            self.migrator
                .run_in_transaction(
                    &connection.connection_string(&state.master_password),
                    &state.migration_queries,
                )
                .await
                .with_context(|| format!("{step} failed for {target_id}"))?;
            state.migration_queries.len()
        };

        let dns_updated = if state.dns_config.is_complete() {
            self.enter(step, RotationStep::UpdatingDns, &state.dns_config.record_name);
            self.dns
                .upsert_cname(&state.dns_config, &connection.host)
                .await
                .with_context(|| format!("{step} failed for {}", state.dns_config.record_name))?;
            true
        } else {
            self.reporter
                .report_skip(RotationStep::UpdatingDns, "DNS settings incomplete");
            false
        };

        let retired = match (&stale_id, rollback) {
            (_, true) => {
                self.reporter
                    .report_skip(RotationStep::RetiringPrevious, "rollback keeps both replicas");
                RetireOutcome::SkippedForRollback
            }
            (None, false) => {
                self.reporter
                    .report_skip(RotationStep::RetiringPrevious, "no stale replica");
                RetireOutcome::NothingToRetire
            }
            (Some(stale), false) => {
                self.enter(step, RotationStep::RetiringPrevious, stale);
                self.retire(source.kind, stale)
                    .await
                    .with_context(|| format!("{step} failed for {stale}"))?
            }
        };

        let slots = next_slots(&state.slots(), Slot::new(target_id.clone(), connection.host.clone()));
        state.set_slots(slots.clone());
        state.rollback_flag = false;
        self.store
            .save(name, &state)
            .await
            .with_context(|| format!("Failed to persist rotation document for {name}"))?;
        self.enter(step, RotationStep::Persisted, name);

        Ok(RotationOutcome {
            deployment: name.to_string(),
            kind: source.kind,
            target: target_id,
            endpoint: connection.host,
            rollback,
            migrations_applied,
            dns_updated,
            retired,
            slots,
        })
    }

    /// The previous replica must still exist and not be torn down.
    async fn check_rollback_target(&self, target: &CloneTarget) -> Result<()> {
        let unavailable = |reason: String| RotateError::RollbackUnavailable {
            resource: target.identifier().to_string(),
            reason,
        };

        let Some(existing) = target.describe(&self.rds).await? else {
            return Err(unavailable("it no longer exists".into()).into());
        };
        match &existing.status {
            ResourceStatus::Deleting | ResourceStatus::Failed(_) => {
                Err(unavailable(format!("status is {}", existing.status)).into())
            }
            _ => Ok(()),
        }
    }

    /// Delete a leftover clone with today's identifier and wait until it is gone.
    async fn clear_collision(&self, target: &CloneTarget) -> Result<()> {
        let Some(existing) = target.describe(&self.rds).await? else {
            return Ok(());
        };

        if existing.status.is_deleting() {
            info!(identifier = %target.identifier(), "Colliding clone is already being deleted");
        } else {
            warn!(
                identifier = %target.identifier(),
                status = %existing.status,
                "Clone already exists, deleting it before launching a new one"
            );
            target.delete(&self.rds).await?;
        }
        target.wait_deleted(&self.rds).await
    }

    /// Request deletion of yesterday's replica unless it is protected.
    async fn retire(&self, kind: ResourceKind, stale: &str) -> Result<RetireOutcome> {
        let target = CloneTarget::new(kind, stale, &self.waits);
        let Some(existing) = target.describe(&self.rds).await? else {
            info!(identifier = %stale, "No stale replica to retire");
            return Ok(RetireOutcome::Absent);
        };

        if existing.status.is_deleting() {
            info!(identifier = %stale, "Stale replica is already being deleted");
            return Ok(RetireOutcome::AlreadyDeleting);
        }

        match is_protected_resource(&self.rds, &existing.arn).await {
            Err(e) => {
                warn!(identifier = %stale, error = %format!("{e:#}"), "Failed to read tags, skipping deletion");
                Ok(RetireOutcome::TagLookupFailed)
            }
            Ok(true) => {
                info!(identifier = %stale, "Stale replica is protected, skipping deletion");
                Ok(RetireOutcome::Protected)
            }
            Ok(false) => {
                target.delete(&self.rds).await?;
                info!(identifier = %stale, "Stale replica deletion requested");
                Ok(RetireOutcome::DeleteRequested)
            }
        }
    }
}
