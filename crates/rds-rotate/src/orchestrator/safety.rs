//! Protection check before deleting a retired replica

use crate::aws::RdsOperations;
use anyhow::Result;
use rds_rotate_common::tags::is_protected;

/// Whether the resource at `arn` carries the protected tag.
///
/// Errors from the tag lookup are returned to the caller, which must treat
/// them as "do not delete".
pub async fn is_protected_resource<R: RdsOperations>(rds: &R, arn: &str) -> Result<bool> {
    let tags = rds.list_tags(arn).await?;
    Ok(is_protected(
        tags.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    ))
}
