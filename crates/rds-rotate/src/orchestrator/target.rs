//! Clone targets: the resource a rotation provisions
//!
//! A deployment clones either a standalone DB instance or an Aurora cluster.
//! Both shapes expose the same lifecycle; the cluster shape additionally owns
//! a single member instance (`<cluster>-001`) that must exist before the
//! cluster has a usable endpoint.

use crate::aws::{
    CreateClusterMemberRequest, ModifyClusterRequest, ModifyInstanceRequest, RdsOperations,
    RestoreClusterRequest, RestoreInstanceRequest, rds::non_empty,
};
use crate::error::RotateError;
use crate::migrate::ConnectionInfo;
use crate::wait::{Readiness, WaitConfig, WaitSettings, wait_for_resource};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rds_rotate_common::defaults::{
    DEFAULT_DATABASE_NAME, DEFAULT_INSTANCE_CLASS, cluster_member_identifier,
};
use rds_rotate_common::tags::clone_tags;
use rds_rotate_common::{ResourceKind, ResourceStatus, RotationState};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Settings applied to a clone, resolved from the rotation document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneConfig {
    pub instance_class: Option<String>,
    pub availability_zone: Option<String>,
    pub subnet_group: Option<String>,
    pub publicly_accessible: bool,
    pub security_group_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
    /// `None` leaves the restored master password in place
    pub master_password: Option<String>,
}

impl CloneConfig {
    pub fn from_document(state: &RotationState, deployment: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            instance_class: non_empty(&state.instance_class),
            availability_zone: non_empty(&state.availability_zone),
            subnet_group: non_empty(&state.subnet_group),
            publicly_accessible: state.publicly_accessible,
            security_group_ids: state
                .security_group_ids
                .iter()
                .filter_map(|id| non_empty(id))
                .collect(),
            tags: clone_tags(&state.tags, deployment, created_at),
            master_password: (!state.master_password.is_empty())
                .then(|| state.master_password.clone()),
        }
    }
}

/// Existing resource, as seen by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct LiveResource {
    pub arn: String,
    pub status: ResourceStatus,
}

/// The resource a rotation provisions, with its wait policies
#[derive(Debug, Clone, PartialEq)]
pub enum CloneTarget {
    Instance {
        identifier: String,
        wait: WaitConfig,
    },
    Cluster {
        identifier: String,
        member: String,
        wait: WaitConfig,
        member_wait: WaitConfig,
    },
}

/// Map an observed status onto the waiter's decision.
fn readiness(resource: &str, status: &ResourceStatus) -> Result<Readiness> {
    match status {
        ResourceStatus::Available => Ok(Readiness::Ready),
        ResourceStatus::Transitioning(s) => Ok(Readiness::NotReady(s.clone())),
        ResourceStatus::Deleting | ResourceStatus::Failed(_) => Err(RotateError::UnexpectedStatus {
            resource: resource.to_string(),
            status: status.to_string(),
        }
        .into()),
    }
}

/// A resource being torn down cannot be reused.
fn refuse_deleting(resource: &str, status: &ResourceStatus) -> Result<()> {
    if status.is_deleting() {
        return Err(RotateError::UnexpectedStatus {
            resource: resource.to_string(),
            status: status.to_string(),
        }
        .into());
    }
    Ok(())
}

async fn wait_instance_available<R: RdsOperations>(
    rds: &R,
    identifier: &str,
    wait: &WaitConfig,
) -> Result<()> {
    info!(identifier = %identifier, "Waiting for DB instance to become available");
    wait_for_resource(wait, identifier, move || async move {
        match rds.describe_instance(identifier).await? {
            Some(instance) => readiness(identifier, &instance.status),
            None => Err(RotateError::Missing {
                resource: identifier.to_string(),
            }
            .into()),
        }
    })
    .await?;
    info!(identifier = %identifier, "DB instance is available");
    Ok(())
}

async fn wait_cluster_available<R: RdsOperations>(
    rds: &R,
    identifier: &str,
    wait: &WaitConfig,
) -> Result<()> {
    info!(identifier = %identifier, "Waiting for DB cluster to become available");
    wait_for_resource(wait, identifier, move || async move {
        match rds.describe_cluster(identifier).await? {
            Some(cluster) => readiness(identifier, &cluster.status),
            None => Err(RotateError::Missing {
                resource: identifier.to_string(),
            }
            .into()),
        }
    })
    .await?;
    info!(identifier = %identifier, "DB cluster is available");
    Ok(())
}

impl CloneTarget {
    pub fn new(kind: ResourceKind, identifier: impl Into<String>, waits: &WaitSettings) -> Self {
        let identifier = identifier.into();
        match kind {
            ResourceKind::DbInstance => CloneTarget::Instance {
                identifier,
                wait: waits.instance.clone(),
            },
            ResourceKind::DbCluster => CloneTarget::Cluster {
                member: cluster_member_identifier(&identifier),
                identifier,
                wait: waits.cluster.clone(),
                member_wait: waits.instance.clone(),
            },
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            CloneTarget::Instance { identifier, .. } | CloneTarget::Cluster { identifier, .. } => {
                identifier
            }
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            CloneTarget::Instance { .. } => ResourceKind::DbInstance,
            CloneTarget::Cluster { .. } => ResourceKind::DbCluster,
        }
    }

    /// ARN and status of the top-level resource, `None` if it does not exist
    pub async fn describe<R: RdsOperations>(&self, rds: &R) -> Result<Option<LiveResource>> {
        Ok(match self {
            CloneTarget::Instance { identifier, .. } => {
                rds.describe_instance(identifier).await?.map(|i| LiveResource {
                    arn: i.arn,
                    status: i.status,
                })
            }
            CloneTarget::Cluster { identifier, .. } => {
                rds.describe_cluster(identifier).await?.map(|c| LiveResource {
                    arn: c.arn,
                    status: c.status,
                })
            }
        })
    }

    pub async fn exists<R: RdsOperations>(&self, rds: &R) -> Result<bool> {
        Ok(self.describe(rds).await?.is_some())
    }

    /// Request a point-in-time clone of `source` unless the target already
    /// exists. For clusters this also waits for the cluster and requests its
    /// member instance, since a member can only join an available cluster.
    pub async fn ensure_created<R: RdsOperations>(
        &self,
        rds: &R,
        source: &str,
        config: &CloneConfig,
    ) -> Result<()> {
        match self {
            CloneTarget::Instance { identifier, .. } => {
                if let Some(existing) = rds.describe_instance(identifier).await? {
                    refuse_deleting(identifier, &existing.status)?;
                    info!(
                        identifier = %identifier,
                        status = %existing.status,
                        "DB instance already exists, reusing it"
                    );
                    return Ok(());
                }
                rds.restore_instance(&RestoreInstanceRequest {
                    source_identifier: source.to_string(),
                    target_identifier: identifier.clone(),
                    instance_class: config.instance_class.clone(),
                    availability_zone: config.availability_zone.clone(),
                    subnet_group: config.subnet_group.clone(),
                    publicly_accessible: config.publicly_accessible,
                    security_group_ids: config.security_group_ids.clone(),
                    tags: config.tags.clone(),
                })
                .await
            }
            CloneTarget::Cluster {
                identifier,
                member,
                wait,
                ..
            } => {
                if let Some(existing) = rds.describe_cluster(identifier).await? {
                    refuse_deleting(identifier, &existing.status)?;
                    info!(
                        identifier = %identifier,
                        status = %existing.status,
                        "DB cluster already exists, reusing it"
                    );
                } else {
                    rds.restore_cluster(&RestoreClusterRequest {
                        source_identifier: source.to_string(),
                        target_identifier: identifier.clone(),
                        subnet_group: config.subnet_group.clone(),
                        security_group_ids: config.security_group_ids.clone(),
                        tags: config.tags.clone(),
                    })
                    .await?;
                }

                wait_cluster_available(rds, identifier, wait).await?;

                if rds.describe_instance(member).await?.is_some() {
                    debug!(member = %member, "Cluster member already exists");
                    return Ok(());
                }

                let cluster = rds.describe_cluster(identifier).await?.ok_or_else(|| {
                    RotateError::Missing {
                        resource: identifier.clone(),
                    }
                })?;
                let engine = match cluster.engine {
                    Some(engine) => engine,
                    None => rds
                        .describe_cluster(source)
                        .await?
                        .and_then(|c| c.engine)
                        .with_context(|| {
                            format!("Cannot determine the engine of DB cluster {identifier}")
                        })?,
                };

                rds.create_cluster_member(&CreateClusterMemberRequest {
                    cluster_identifier: identifier.clone(),
                    instance_identifier: member.clone(),
                    engine,
                    instance_class: config
                        .instance_class
                        .clone()
                        .unwrap_or_else(|| DEFAULT_INSTANCE_CLASS.to_string()),
                    availability_zone: config.availability_zone.clone(),
                    publicly_accessible: config.publicly_accessible,
                    tags: config.tags.clone(),
                })
                .await
            }
        }
    }

    /// Block until the target (and its member, for clusters) is available.
    pub async fn wait_available<R: RdsOperations>(&self, rds: &R) -> Result<()> {
        match self {
            CloneTarget::Instance { identifier, wait } => {
                wait_instance_available(rds, identifier, wait).await
            }
            CloneTarget::Cluster {
                identifier,
                member,
                wait,
                member_wait,
            } => {
                wait_cluster_available(rds, identifier, wait).await?;
                wait_instance_available(rds, member, member_wait).await
            }
        }
    }

    /// Apply class, access, security groups and password, then wait.
    pub async fn apply_config<R: RdsOperations>(&self, rds: &R, config: &CloneConfig) -> Result<()> {
        match self {
            CloneTarget::Instance { identifier, .. } => {
                rds.modify_instance(&ModifyInstanceRequest {
                    identifier: identifier.clone(),
                    instance_class: config.instance_class.clone(),
                    publicly_accessible: config.publicly_accessible,
                    security_group_ids: config.security_group_ids.clone(),
                    master_password: config.master_password.clone(),
                })
                .await?;
            }
            CloneTarget::Cluster {
                identifier, member, ..
            } => {
                if config.security_group_ids.is_empty() && config.master_password.is_none() {
                    debug!(identifier = %identifier, "Nothing to modify on DB cluster");
                } else {
                    rds.modify_cluster(&ModifyClusterRequest {
                        identifier: identifier.clone(),
                        security_group_ids: config.security_group_ids.clone(),
                        master_password: config.master_password.clone(),
                    })
                    .await?;
                }
                rds.modify_instance(&ModifyInstanceRequest {
                    identifier: member.clone(),
                    instance_class: config.instance_class.clone(),
                    publicly_accessible: config.publicly_accessible,
                    security_group_ids: Vec::new(),
                    master_password: None,
                })
                .await?;
            }
        }
        self.wait_available(rds).await
    }

    /// Endpoint and login for running migrations and pointing DNS.
    pub async fn connection_info<R: RdsOperations>(&self, rds: &R) -> Result<ConnectionInfo> {
        let identifier = self.identifier();
        let missing = || RotateError::Missing {
            resource: identifier.to_string(),
        };

        let (host, port, database, user) = match self {
            CloneTarget::Instance { .. } => {
                let instance = rds.describe_instance(identifier).await?.ok_or_else(missing)?;
                (
                    instance.endpoint,
                    instance.port,
                    instance.db_name,
                    instance.master_username,
                )
            }
            CloneTarget::Cluster { .. } => {
                let cluster = rds.describe_cluster(identifier).await?.ok_or_else(missing)?;
                (
                    cluster.endpoint,
                    cluster.port,
                    cluster.database_name,
                    cluster.master_username,
                )
            }
        };

        Ok(ConnectionInfo {
            host: host.with_context(|| format!("{identifier} has no endpoint"))?,
            port: port.with_context(|| format!("{identifier} has no port"))?,
            database: database
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            user: user.with_context(|| format!("{identifier} has no master username"))?,
        })
    }

    /// Request deletion without a final snapshot. Cluster members go first.
    pub async fn delete<R: RdsOperations>(&self, rds: &R) -> Result<()> {
        match self {
            CloneTarget::Instance { identifier, .. } => rds.delete_instance(identifier).await,
            CloneTarget::Cluster { identifier, .. } => {
                let Some(cluster) = rds.describe_cluster(identifier).await? else {
                    debug!(identifier = %identifier, "DB cluster already gone");
                    return Ok(());
                };
                for member in &cluster.members {
                    match rds.describe_instance(member).await? {
                        Some(instance) if instance.status.is_deleting() => {
                            debug!(member = %member, "Cluster member already being deleted");
                        }
                        Some(_) => rds.delete_instance(member).await?,
                        None => debug!(member = %member, "Cluster member already gone"),
                    }
                }
                rds.delete_cluster(identifier).await
            }
        }
    }

    /// Block until the top-level resource no longer exists.
    pub async fn wait_deleted<R: RdsOperations>(&self, rds: &R) -> Result<()> {
        let identifier = self.identifier();
        let wait = match self {
            CloneTarget::Instance { wait, .. } | CloneTarget::Cluster { wait, .. } => wait,
        };

        info!(identifier = %identifier, kind = %self.kind(), "Waiting for deletion");
        wait_for_resource(wait, identifier, move || async move {
            let status = match self {
                CloneTarget::Instance { .. } => {
                    rds.describe_instance(identifier).await?.map(|i| i.status)
                }
                CloneTarget::Cluster { .. } => {
                    rds.describe_cluster(identifier).await?.map(|c| c.status)
                }
            };
            Ok(match status {
                None => Readiness::Ready,
                Some(ResourceStatus::Deleting) => Readiness::NotReady("deleting".into()),
                Some(other) => {
                    warn!(identifier = %identifier, status = %other, "Resource not deleting yet");
                    Readiness::NotReady(other.to_string())
                }
            })
        })
        .await?;
        info!(identifier = %identifier, "Deleted");
        Ok(())
    }
}
