//! RDS operations trait for testing

use super::RdsClient;
use super::types::{
    CreateClusterMemberRequest, DbClusterInfo, DbInstanceInfo, ModifyClusterRequest,
    ModifyInstanceRequest, RestoreClusterRequest, RestoreInstanceRequest,
};
use anyhow::Result;
use std::collections::BTreeMap;
use std::future::Future;

/// Trait for RDS operations that can be faked in tests.
///
/// Describe calls return `Ok(None)` for resources that do not exist, and
/// deletes of absent resources succeed.
pub trait RdsOperations: Send + Sync {
    fn describe_instance(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<DbInstanceInfo>>> + Send;

    fn describe_cluster(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<DbClusterInfo>>> + Send;

    fn restore_instance(
        &self,
        request: &RestoreInstanceRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    fn restore_cluster(
        &self,
        request: &RestoreClusterRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    fn create_cluster_member(
        &self,
        request: &CreateClusterMemberRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    fn modify_instance(
        &self,
        request: &ModifyInstanceRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    fn modify_cluster(
        &self,
        request: &ModifyClusterRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete without a final snapshot
    fn delete_instance(&self, identifier: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete without a final snapshot. Members must be deleted separately.
    fn delete_cluster(&self, identifier: &str) -> impl Future<Output = Result<()>> + Send;

    fn list_tags(&self, arn: &str) -> impl Future<Output = Result<BTreeMap<String, String>>> + Send;
}

impl RdsOperations for RdsClient {
    async fn describe_instance(&self, identifier: &str) -> Result<Option<DbInstanceInfo>> {
        RdsClient::describe_instance(self, identifier).await
    }

    async fn describe_cluster(&self, identifier: &str) -> Result<Option<DbClusterInfo>> {
        RdsClient::describe_cluster(self, identifier).await
    }

    async fn restore_instance(&self, request: &RestoreInstanceRequest) -> Result<()> {
        RdsClient::restore_instance(self, request).await
    }

    async fn restore_cluster(&self, request: &RestoreClusterRequest) -> Result<()> {
        RdsClient::restore_cluster(self, request).await
    }

    async fn create_cluster_member(&self, request: &CreateClusterMemberRequest) -> Result<()> {
        RdsClient::create_cluster_member(self, request).await
    }

    async fn modify_instance(&self, request: &ModifyInstanceRequest) -> Result<()> {
        RdsClient::modify_instance(self, request).await
    }

    async fn modify_cluster(&self, request: &ModifyClusterRequest) -> Result<()> {
        RdsClient::modify_cluster(self, request).await
    }

    async fn delete_instance(&self, identifier: &str) -> Result<()> {
        RdsClient::delete_instance(self, identifier).await
    }

    async fn delete_cluster(&self, identifier: &str) -> Result<()> {
        RdsClient::delete_cluster(self, identifier).await
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>> {
        RdsClient::list_tags(self, arn).await
    }
}
