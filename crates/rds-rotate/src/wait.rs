//! Polling RDS resources until they reach a target condition.
//!
//! Polls at a fixed interval, optionally bounded by an attempt ceiling, and
//! logs a heartbeat while waiting. Transient "not ready" errors from the
//! describe call count as another not-ready poll rather than a failure.

use crate::aws::classify_anyhow_error;
use crate::error::RotateError;
use anyhow::Result;
use rds_rotate_common::defaults::{
    DEFAULT_CLUSTER_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROGRESS_INTERVAL_SECS,
};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// Result of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Not there yet, with the observed status
    NotReady(String),
}

/// Configuration for one kind of wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between polls
    pub interval: Duration,
    /// Ceiling on polls, `None` waits indefinitely
    pub max_attempts: Option<u32>,
    /// How often to log a heartbeat while waiting
    pub progress_interval: Duration,
}

impl WaitConfig {
    /// DB instances: unbounded, 30s interval
    pub fn instance() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: None,
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS),
        }
    }

    /// DB clusters: 120 attempts at 30s
    pub fn cluster() -> Self {
        Self {
            max_attempts: Some(DEFAULT_CLUSTER_MAX_ATTEMPTS),
            ..Self::instance()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Wait policies for the two resource kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSettings {
    pub instance: WaitConfig,
    pub cluster: WaitConfig,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            instance: WaitConfig::instance(),
            cluster: WaitConfig::cluster(),
        }
    }
}

/// Spawn a task that logs a heartbeat until the returned guard is dropped.
pub(crate) fn spawn_progress_ticker(
    resource: &str,
    every: Duration,
) -> (DropGuard, JoinHandle<()>) {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let resource = resource.to_string();

    let handle = tokio::spawn(async move {
        let start = Instant::now();
        let mut ticker = tokio::time::interval_at(start + every, every);
        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    info!(
                        resource = %resource,
                        elapsed_secs = start.elapsed().as_secs(),
                        "Still waiting"
                    );
                }
            }
        }
    });

    (token.drop_guard(), handle)
}

/// Poll `check` until it reports [`Readiness::Ready`].
///
/// Sleeps `interval` after every not-ready poll. With `max_attempts` set, the
/// wait fails with [`RotateError::WaitTimeout`] after that many polls. Errors
/// from `check` are returned immediately unless they classify as "not ready".
///
/// # Example
/// ```ignore
/// wait_for_resource(&WaitConfig::cluster(), "orders-20240315", || async {
///     Ok(Readiness::Ready)
/// })
/// .await?;
/// ```
pub async fn wait_for_resource<F, Fut>(config: &WaitConfig, resource: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Readiness>>,
{
    let start = Instant::now();
    let (_ticker, _) = spawn_progress_ticker(resource, config.progress_interval);
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match check().await {
            Ok(Readiness::Ready) => {
                debug!(resource = %resource, attempts, "Resource ready");
                return Ok(());
            }
            Ok(Readiness::NotReady(status)) => {
                debug!(resource = %resource, attempt = attempts, status = %status, "Resource not ready");
            }
            Err(e) if classify_anyhow_error(&e).is_not_ready() => {
                debug!(resource = %resource, attempt = attempts, error = %e, "Resource busy, retrying");
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(config.interval).await;

        if let Some(max) = config.max_attempts {
            if attempts >= max {
                return Err(RotateError::WaitTimeout {
                    resource: resource.to_string(),
                    attempts,
                    elapsed_secs: start.elapsed().as_secs(),
                }
                .into());
            }
        }
    }
}
