//! Rotation steps and outcomes

use rds_rotate_common::{ResourceKind, Slots};

/// States of a rotation run, in order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum RotationStep {
    Init,
    ClearingCollision,
    Cloning,
    WaitingAvailable,
    Configuring,
    Migrating,
    UpdatingDns,
    RetiringPrevious,
    Persisted,
}

/// What happened to yesterday's replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RetireOutcome {
    /// Rollback runs never retire anything
    SkippedForRollback,
    /// No stale identifier could be derived
    NothingToRetire,
    /// Stale replica does not exist
    Absent,
    /// Stale replica is already being deleted
    AlreadyDeleting,
    /// Stale replica carries the protected tag
    Protected,
    /// Tags could not be read, so deletion was skipped
    TagLookupFailed,
    /// Deletion requested; not awaited
    DeleteRequested,
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RotationOutcome {
    pub deployment: String,
    pub kind: ResourceKind,
    /// Identifier of the replica now live
    pub target: String,
    pub endpoint: String,
    pub rollback: bool,
    pub migrations_applied: usize,
    pub dns_updated: bool,
    pub retired: RetireOutcome,
    /// Slots as persisted
    pub slots: Slots,
}

/// Per-run switches from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotateOptions {
    /// Roll back even if the document's flag is unset
    pub rollback: bool,
    /// Reuse a clone left by an interrupted run instead of recreating it
    pub resume: bool,
}
