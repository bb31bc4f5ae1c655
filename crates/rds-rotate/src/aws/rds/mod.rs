//! RDS instance and cluster management

mod operations;
mod types;

pub use operations::RdsOperations;
pub use types::{
    CreateClusterMemberRequest, DbClusterInfo, DbInstanceInfo, ModifyClusterRequest,
    ModifyInstanceRequest, RestoreClusterRequest, RestoreInstanceRequest, non_empty,
};

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::{AwsError, classify_anyhow_error, ignore_not_found};
use anyhow::{Context, Result};
use aws_sdk_rds::Client;
use aws_sdk_rds::types::{DbCluster, DbInstance, Tag};
use backon::{ExponentialBuilder, Retryable};
use rds_rotate_common::ResourceStatus;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// RDS client for cloning, modifying and deleting databases
#[derive(Clone)]
pub struct RdsClient {
    pub(crate) client: Client,
}

impl FromAwsContext for RdsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.rds_client(),
        }
    }
}

/// Retry a request while RDS is throttling us
async fn retry_throttled<T, F, Fut>(operation: &str, request: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    request
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(30))
                .with_max_times(5),
        )
        .when(|e| classify_anyhow_error(e).is_retryable())
        .notify(|e, dur| {
            warn!(
                operation = %operation,
                delay = ?dur,
                error = %e,
                "RDS request throttled, retrying..."
            );
        })
        .await
}

fn rds_tags(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

fn port(raw: Option<i32>) -> Option<u16> {
    raw.and_then(|p| u16::try_from(p).ok())
}

fn instance_info(instance: &DbInstance) -> DbInstanceInfo {
    let endpoint = instance.endpoint();
    DbInstanceInfo {
        identifier: instance.db_instance_identifier().unwrap_or_default().to_string(),
        arn: instance.db_instance_arn().unwrap_or_default().to_string(),
        status: ResourceStatus::parse(instance.db_instance_status().unwrap_or_default()),
        endpoint: endpoint
            .and_then(|e| e.address())
            .map(|s| s.to_string()),
        port: port(endpoint.and_then(|e| e.port())),
        db_name: instance.db_name().map(|s| s.to_string()),
        master_username: instance.master_username().map(|s| s.to_string()),
        cluster_identifier: instance.db_cluster_identifier().map(|s| s.to_string()),
    }
}

fn cluster_info(cluster: &DbCluster) -> DbClusterInfo {
    DbClusterInfo {
        identifier: cluster.db_cluster_identifier().unwrap_or_default().to_string(),
        arn: cluster.db_cluster_arn().unwrap_or_default().to_string(),
        status: ResourceStatus::parse(cluster.status().unwrap_or_default()),
        endpoint: cluster.endpoint().map(|s| s.to_string()),
        port: port(cluster.port()),
        database_name: cluster.database_name().map(|s| s.to_string()),
        master_username: cluster.master_username().map(|s| s.to_string()),
        engine: cluster.engine().map(|s| s.to_string()),
        members: cluster
            .db_cluster_members()
            .iter()
            .filter_map(|m| m.db_instance_identifier())
            .map(|s| s.to_string())
            .collect(),
    }
}

impl RdsClient {
    /// Describe a DB instance, `None` if it does not exist
    pub async fn describe_instance(&self, identifier: &str) -> Result<Option<DbInstanceInfo>> {
        let result = retry_throttled("DescribeDBInstances", || async {
            self.client
                .describe_db_instances()
                .db_instance_identifier(identifier)
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await;

        match result {
            Ok(response) => Ok(response.db_instances().first().map(instance_info)),
            Err(e) if classify_anyhow_error(&e).is_not_found() => Ok(None),
            Err(e) => Err(e.context(format!("Failed to describe DB instance {identifier}"))),
        }
    }

    /// Describe a DB cluster, `None` if it does not exist
    pub async fn describe_cluster(&self, identifier: &str) -> Result<Option<DbClusterInfo>> {
        let result = retry_throttled("DescribeDBClusters", || async {
            self.client
                .describe_db_clusters()
                .db_cluster_identifier(identifier)
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await;

        match result {
            Ok(response) => Ok(response.db_clusters().first().map(cluster_info)),
            Err(e) if classify_anyhow_error(&e).is_not_found() => Ok(None),
            Err(e) => Err(e.context(format!("Failed to describe DB cluster {identifier}"))),
        }
    }

    /// Clone a DB instance at its latest restorable time
    pub async fn restore_instance(&self, request: &RestoreInstanceRequest) -> Result<()> {
        info!(
            source = %request.source_identifier,
            target = %request.target_identifier,
            "Restoring DB instance to latest restorable time"
        );

        retry_throttled("RestoreDBInstanceToPointInTime", || async {
            self.client
                .restore_db_instance_to_point_in_time()
                .source_db_instance_identifier(&request.source_identifier)
                .target_db_instance_identifier(&request.target_identifier)
                .use_latest_restorable_time(true)
                .set_db_instance_class(request.instance_class.clone())
                .set_availability_zone(request.availability_zone.clone())
                .set_db_subnet_group_name(request.subnet_group.clone())
                .publicly_accessible(request.publicly_accessible)
                .set_vpc_security_group_ids(
                    (!request.security_group_ids.is_empty())
                        .then(|| request.security_group_ids.clone()),
                )
                .set_tags(Some(rds_tags(&request.tags)))
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await
        .with_context(|| {
            format!(
                "Failed to clone DB instance {} from {}",
                request.target_identifier, request.source_identifier
            )
        })?;

        Ok(())
    }

    /// Clone a DB cluster at its latest restorable time
    pub async fn restore_cluster(&self, request: &RestoreClusterRequest) -> Result<()> {
        info!(
            source = %request.source_identifier,
            target = %request.target_identifier,
            "Restoring DB cluster to latest restorable time"
        );

        retry_throttled("RestoreDBClusterToPointInTime", || async {
            self.client
                .restore_db_cluster_to_point_in_time()
                .source_db_cluster_identifier(&request.source_identifier)
                .db_cluster_identifier(&request.target_identifier)
                .use_latest_restorable_time(true)
                .set_db_subnet_group_name(request.subnet_group.clone())
                .set_vpc_security_group_ids(
                    (!request.security_group_ids.is_empty())
                        .then(|| request.security_group_ids.clone()),
                )
                .set_tags(Some(rds_tags(&request.tags)))
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await
        .with_context(|| {
            format!(
                "Failed to clone DB cluster {} from {}",
                request.target_identifier, request.source_identifier
            )
        })?;

        Ok(())
    }

    /// Create the member instance of a restored cluster
    pub async fn create_cluster_member(&self, request: &CreateClusterMemberRequest) -> Result<()> {
        info!(
            cluster = %request.cluster_identifier,
            instance = %request.instance_identifier,
            engine = %request.engine,
            "Creating cluster member instance"
        );

        retry_throttled("CreateDBInstance", || async {
            self.client
                .create_db_instance()
                .db_cluster_identifier(&request.cluster_identifier)
                .db_instance_identifier(&request.instance_identifier)
                .engine(&request.engine)
                .db_instance_class(&request.instance_class)
                .set_availability_zone(request.availability_zone.clone())
                .publicly_accessible(request.publicly_accessible)
                .set_tags(Some(rds_tags(&request.tags)))
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await
        .with_context(|| {
            format!(
                "Failed to create instance {} in cluster {}",
                request.instance_identifier, request.cluster_identifier
            )
        })?;

        Ok(())
    }

    /// Modify a DB instance, applied immediately
    pub async fn modify_instance(&self, request: &ModifyInstanceRequest) -> Result<()> {
        info!(
            identifier = %request.identifier,
            instance_class = ?request.instance_class,
            publicly_accessible = request.publicly_accessible,
            "Modifying DB instance"
        );

        retry_throttled("ModifyDBInstance", || async {
            self.client
                .modify_db_instance()
                .db_instance_identifier(&request.identifier)
                .set_db_instance_class(request.instance_class.clone())
                .publicly_accessible(request.publicly_accessible)
                .set_vpc_security_group_ids(
                    (!request.security_group_ids.is_empty())
                        .then(|| request.security_group_ids.clone()),
                )
                .set_master_user_password(request.master_password.clone())
                .apply_immediately(true)
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await
        .with_context(|| format!("Failed to modify DB instance {}", request.identifier))?;

        Ok(())
    }

    /// Modify a DB cluster, applied immediately
    pub async fn modify_cluster(&self, request: &ModifyClusterRequest) -> Result<()> {
        info!(identifier = %request.identifier, "Modifying DB cluster");

        retry_throttled("ModifyDBCluster", || async {
            self.client
                .modify_db_cluster()
                .db_cluster_identifier(&request.identifier)
                .set_vpc_security_group_ids(
                    (!request.security_group_ids.is_empty())
                        .then(|| request.security_group_ids.clone()),
                )
                .set_master_user_password(request.master_password.clone())
                .apply_immediately(true)
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await
        .with_context(|| format!("Failed to modify DB cluster {}", request.identifier))?;

        Ok(())
    }

    /// Delete a DB instance without a final snapshot
    ///
    /// Returns Ok(()) if the instance is already gone.
    pub async fn delete_instance(&self, identifier: &str) -> Result<()> {
        info!(identifier = %identifier, "Deleting DB instance");

        retry_throttled("DeleteDBInstance", || async {
            let result = self
                .client
                .delete_db_instance()
                .db_instance_identifier(identifier)
                .skip_final_snapshot(true)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| AwsError::from_sdk(&e));
            Ok(ignore_not_found(result)?)
        })
        .await
        .with_context(|| format!("Failed to delete DB instance {identifier}"))?;

        debug!(identifier = %identifier, "DB instance deletion requested");
        Ok(())
    }

    /// Delete a DB cluster without a final snapshot
    ///
    /// Returns Ok(()) if the cluster is already gone.
    pub async fn delete_cluster(&self, identifier: &str) -> Result<()> {
        info!(identifier = %identifier, "Deleting DB cluster");

        retry_throttled("DeleteDBCluster", || async {
            let result = self
                .client
                .delete_db_cluster()
                .db_cluster_identifier(identifier)
                .skip_final_snapshot(true)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| AwsError::from_sdk(&e));
            Ok(ignore_not_found(result)?)
        })
        .await
        .with_context(|| format!("Failed to delete DB cluster {identifier}"))?;

        debug!(identifier = %identifier, "DB cluster deletion requested");
        Ok(())
    }

    /// Tags attached to a resource ARN
    pub async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>> {
        let response = retry_throttled("ListTagsForResource", || async {
            self.client
                .list_tags_for_resource()
                .resource_name(arn)
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e).into())
        })
        .await
        .with_context(|| format!("Failed to list tags for {arn}"))?;

        Ok(response
            .tag_list()
            .iter()
            .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
            .collect())
    }
}
