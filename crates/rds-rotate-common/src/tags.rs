//! Resource tag constants for rds-rotate
//!
//! Every clone created by a rotation run carries the deployment's configured
//! tags plus these standard tags, so replicas can be traced back to the
//! deployment that produced them.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `rds-rotate:tool` | Static identifier ("rds-rotate") |
//! | `rds-rotate:deployment` | Name of the rotation document |
//! | `rds-rotate:created-at` | RFC 3339 creation timestamp |
//!
//! The deletion safety gate looks for [`PROTECTED_TAG_KEY`] =
//! [`PROTECTED_TAG_VALUE`] and refuses to retire anything carrying it.

use std::collections::BTreeMap;

/// Tag key for tool identification
pub const TAG_TOOL: &str = "rds-rotate:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "rds-rotate";

/// Tag key for the deployment name
pub const TAG_DEPLOYMENT: &str = "rds-rotate:deployment";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "rds-rotate:created-at";

/// Tag key marking the environment of a resource
pub const PROTECTED_TAG_KEY: &str = "env";

/// Environment value that vetoes automated deletion
pub const PROTECTED_TAG_VALUE: &str = "production";

/// Helper to format creation timestamp for tags
pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Merge the configured tags with the standard rds-rotate tags.
///
/// Standard tags win over configured ones with the same key.
pub fn clone_tags(
    configured: &BTreeMap<String, String>,
    deployment: &str,
    created_at: chrono::DateTime<chrono::Utc>,
) -> BTreeMap<String, String> {
    let mut tags = configured.clone();
    tags.insert(TAG_TOOL.to_string(), TAG_TOOL_VALUE.to_string());
    tags.insert(TAG_DEPLOYMENT.to_string(), deployment.to_string());
    tags.insert(TAG_CREATED_AT.to_string(), format_created_at(created_at));
    tags
}

/// Whether a tag set marks its resource as protected from deletion.
pub fn is_protected<'a, I>(tags: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .any(|(key, value)| key == PROTECTED_TAG_KEY && value == PROTECTED_TAG_VALUE)
}
