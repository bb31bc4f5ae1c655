//! RDS request and descriptor types

use rds_rotate_common::ResourceStatus;
use std::collections::BTreeMap;

/// Snapshot of a DB instance as returned by DescribeDBInstances
#[derive(Debug, Clone, PartialEq)]
pub struct DbInstanceInfo {
    pub identifier: String,
    pub arn: String,
    pub status: ResourceStatus,
    /// Hostname, absent until the instance is reachable
    pub endpoint: Option<String>,
    pub port: Option<u16>,
    pub db_name: Option<String>,
    pub master_username: Option<String>,
    /// Owning cluster for Aurora members
    pub cluster_identifier: Option<String>,
}

/// Snapshot of a DB cluster as returned by DescribeDBClusters
#[derive(Debug, Clone, PartialEq)]
pub struct DbClusterInfo {
    pub identifier: String,
    pub arn: String,
    pub status: ResourceStatus,
    /// Writer endpoint
    pub endpoint: Option<String>,
    pub port: Option<u16>,
    pub database_name: Option<String>,
    pub master_username: Option<String>,
    pub engine: Option<String>,
    /// Identifiers of member instances
    pub members: Vec<String>,
}

/// Point-in-time clone of a DB instance at the latest restorable time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreInstanceRequest {
    pub source_identifier: String,
    pub target_identifier: String,
    pub instance_class: Option<String>,
    pub availability_zone: Option<String>,
    pub subnet_group: Option<String>,
    pub publicly_accessible: bool,
    pub security_group_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

/// Point-in-time clone of a DB cluster at the latest restorable time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreClusterRequest {
    pub source_identifier: String,
    pub target_identifier: String,
    pub subnet_group: Option<String>,
    pub security_group_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

/// Member instance created inside a restored cluster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateClusterMemberRequest {
    pub cluster_identifier: String,
    pub instance_identifier: String,
    pub engine: String,
    pub instance_class: String,
    pub availability_zone: Option<String>,
    pub publicly_accessible: bool,
    pub tags: BTreeMap<String, String>,
}

/// Immediate modification of a DB instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyInstanceRequest {
    pub identifier: String,
    pub instance_class: Option<String>,
    pub publicly_accessible: bool,
    /// Left unchanged when empty
    pub security_group_ids: Vec<String>,
    pub master_password: Option<String>,
}

/// Immediate modification of a DB cluster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyClusterRequest {
    pub identifier: String,
    /// Left unchanged when empty
    pub security_group_ids: Vec<String>,
    pub master_password: Option<String>,
}

/// `None` for empty strings, so unset document fields are not sent to RDS
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("   "), None);
        assert_eq!(non_empty(" ap-northeast-1a "), Some("ap-northeast-1a".to_string()));
    }
}
