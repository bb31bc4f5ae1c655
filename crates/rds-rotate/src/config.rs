//! Configuration types for rotation runs
//!
//! Built from the command line in `main` and validated once, before any
//! client is constructed.

use crate::wait::{WaitConfig, WaitSettings};
use rds_rotate_common::SystemClock;
use rds_rotate_common::defaults::DEFAULT_PROGRESS_INTERVAL_SECS;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a bucket nor a state directory was given
    #[error("no state store: pass --bucket (or set AWS_S3_BUCKET_NAME) or --state-dir")]
    MissingStore,

    /// Bucket name given but empty
    #[error("bucket cannot be empty")]
    EmptyBucket,

    /// Region is empty
    #[error("region cannot be empty")]
    EmptyRegion,

    /// Poll interval is zero
    #[error("poll interval must be at least 1 second")]
    InvalidPollInterval,

    /// An attempt ceiling of zero
    #[error("{0} must be at least 1")]
    InvalidMaxAttempts(&'static str),

    /// Offset does not name a timezone
    #[error("UTC offset must be between -23 and +23 hours, got {0}")]
    InvalidUtcOffset(i32),
}

/// AWS connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    pub region: String,
    /// Named profile (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Where rotation documents live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    S3 { bucket: String },
    Local { dir: PathBuf },
}

/// Waiter budgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval_secs: u64,
    /// `None` waits on instances indefinitely
    pub instance_max_attempts: Option<u32>,
    pub cluster_max_attempts: u32,
}

/// DNS provider endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsApiConfig {
    pub base_url: String,
}

/// Configuration for rotation commands
///
/// Composed of focused sub-configs for organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotateConfig {
    pub aws: AwsConfig,
    pub store: StoreLocation,
    pub polling: PollingConfig,
    pub dns: DnsApiConfig,
    /// Reference timezone for dated identifiers
    pub utc_offset_hours: i32,
}

impl PollingConfig {
    pub fn wait_settings(&self) -> WaitSettings {
        let interval = Duration::from_secs(self.interval_secs);
        let progress = Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS);
        WaitSettings {
            instance: WaitConfig {
                interval,
                max_attempts: self.instance_max_attempts,
                progress_interval: progress,
            },
            cluster: WaitConfig {
                interval,
                max_attempts: Some(self.cluster_max_attempts),
                progress_interval: progress,
            },
        }
    }
}

impl RotateConfig {
    /// Check every field; the first problem wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aws.region.trim().is_empty() {
            return Err(ConfigError::EmptyRegion);
        }
        if let StoreLocation::S3 { bucket } = &self.store {
            if bucket.trim().is_empty() {
                return Err(ConfigError::EmptyBucket);
            }
        }
        if self.polling.interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if self.polling.instance_max_attempts == Some(0) {
            return Err(ConfigError::InvalidMaxAttempts("instance max attempts"));
        }
        if self.polling.cluster_max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts("cluster max attempts"));
        }
        self.clock()?;
        Ok(())
    }

    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        SystemClock::with_utc_offset_hours(self.utc_offset_hours)
            .ok_or(ConfigError::InvalidUtcOffset(self.utc_offset_hours))
    }

    pub fn region(&self) -> &str {
        &self.aws.region
    }

    pub fn aws_profile(&self) -> Option<&str> {
        self.aws.aws_profile.as_deref()
    }
}
