//! RDS status classification
//!
//! RDS reports instance and cluster status as free-form strings. The waiter
//! only cares which class a status falls into: ready, still converging,
//! being deleted, or stuck in a state that will never become available.

/// Statuses that can never converge to "available" without operator action
const TERMINAL_FAILURES: &[&str] = &[
    "failed",
    "incompatible-restore",
    "incompatible-parameters",
    "incompatible-network",
    "incompatible-option-group",
    "inaccessible-encryption-credentials",
    "insufficient-capacity",
    "restore-error",
    "storage-full",
    "cloning-failed",
    "migration-failed",
    "stopped",
];

/// Classified status of an RDS instance or cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    /// `available`
    Available,
    /// `deleting` or `delete-precheck`
    Deleting,
    /// A status that will not converge on its own
    Failed(String),
    /// Any other status (creating, modifying, backing-up, ...)
    Transitioning(String),
}

impl ResourceStatus {
    /// Classify a raw status string as reported by RDS
    pub fn parse(raw: &str) -> Self {
        let status = raw.trim().to_ascii_lowercase();
        match status.as_str() {
            "available" => Self::Available,
            "deleting" | "delete-precheck" => Self::Deleting,
            s if TERMINAL_FAILURES.contains(&s) => Self::Failed(status),
            _ => Self::Transitioning(status),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self, Self::Deleting)
    }

    /// Raw status string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "available",
            Self::Deleting => "deleting",
            Self::Failed(s) | Self::Transitioning(s) => s,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
