//! RDS resource shapes and teardown ordering

/// Types of RDS resources managed by rds-rotate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Standalone DB instance
    DbInstance,
    /// Aurora DB cluster (members must be deleted first)
    DbCluster,
}

impl ResourceKind {
    /// Human-readable name used in logs and errors
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::DbInstance => "DB instance",
            ResourceKind::DbCluster => "DB cluster",
        }
    }

    /// Whether this shape needs a member instance before it has an endpoint
    pub fn needs_member(self) -> bool {
        matches!(self, ResourceKind::DbCluster)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
