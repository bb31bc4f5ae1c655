//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - RDS: point-in-time clones, modification, teardown and tags
//! - S3: rotation document storage

pub mod context;
pub mod error;
pub mod rds;
pub mod s3;

pub use context::{AwsContext, FromAwsContext};
pub use error::{AwsError, classify_anyhow_error, classify_aws_error, ignore_not_found};
pub use rds::{
    CreateClusterMemberRequest, DbClusterInfo, DbInstanceInfo, ModifyClusterRequest,
    ModifyInstanceRequest, RdsClient, RdsOperations, RestoreClusterRequest,
    RestoreInstanceRequest,
};
pub use s3::S3Client;
