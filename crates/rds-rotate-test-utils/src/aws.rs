//! AWS test utilities
//!
//! Region detection and unique names for live integration tests.

use chrono::Utc;
use rds_rotate_common::defaults::DEFAULT_REGION;

/// Get the AWS region for tests.
///
/// Checks `AWS_REGION`, then `AWS_DEFAULT_REGION`, then falls back to the
/// crate default.
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| DEFAULT_REGION.to_string())
}

/// Unique deployment name: `test-{timestamp_ms}-{counter}`.
///
/// ```
/// use rds_rotate_test_utils::aws::test_deployment_name;
///
/// assert!(test_deployment_name().starts_with("test-"));
/// ```
pub fn test_deployment_name() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test-{ts}-{counter}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_name_format() {
        let name = test_deployment_name();
        let parts: Vec<&str> = name.strip_prefix("test-").unwrap().split('-').collect();
        assert_eq!(parts.len(), 2);
        parts[0].parse::<i64>().expect("Should be valid timestamp");
        parts[1].parse::<u32>().expect("Should be valid counter");
    }

    #[test]
    fn test_deployment_names_unique() {
        assert_ne!(test_deployment_name(), test_deployment_name());
    }
}
