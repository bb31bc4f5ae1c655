//! Shared test utilities for rds-rotate
//!
//! Helpers that unit tests in several crates want without pulling in the
//! orchestrator itself.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique deployment names
//! - [`fixtures`]: Sample rotation documents

pub mod aws;
pub mod fixtures;

// Re-export commonly used items
pub use aws::{get_test_region, test_deployment_name};
pub use fixtures::{cluster_document, instance_document, test_date};
