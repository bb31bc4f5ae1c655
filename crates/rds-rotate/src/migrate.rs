//! SQL migrations against a freshly cloned replica
//!
//! All statements run inside one transaction: either every statement applies
//! or none do.

use crate::error::RotateError;
use anyhow::{Context, Result};
use backon::{ConstantBuilder, Retryable};
use rds_rotate_common::defaults::{DEFAULT_PG_CONNECT_ATTEMPTS, DEFAULT_PG_CONNECT_DELAY_SECS};
use std::future::Future;
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{info, warn};

/// Where and as whom to connect to a replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
}

impl ConnectionInfo {
    /// libpq key/value connection string
    pub fn connection_string(&self, password: &str) -> String {
        let mut parts = vec![
            format!("host={}", quote(&self.host)),
            format!("port={}", self.port),
            format!("user={}", quote(&self.user)),
            format!("dbname={}", quote(&self.database)),
        ];
        if !password.is_empty() {
            parts.push(format!("password={}", quote(password)));
        }
        parts.join(" ")
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Runs an ordered list of SQL statements atomically.
pub trait MigrationRunner: Send + Sync {
    /// Fails with [`RotateError::Migration`] naming the first statement that
    /// failed, after rolling back.
    fn run_in_transaction(
        &self,
        connection_string: &str,
        statements: &[String],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// PostgreSQL runner with connection retry
pub struct PostgresMigrator {
    connect_attempts: usize,
    connect_delay: Duration,
}

impl Default for PostgresMigrator {
    fn default() -> Self {
        Self {
            connect_attempts: DEFAULT_PG_CONNECT_ATTEMPTS,
            connect_delay: Duration::from_secs(DEFAULT_PG_CONNECT_DELAY_SECS),
        }
    }
}

impl PostgresMigrator {
    pub fn new(connect_attempts: usize, connect_delay: Duration) -> Self {
        Self {
            connect_attempts: connect_attempts.max(1),
            connect_delay,
        }
    }

    async fn connect(&self, connection_string: &str) -> Result<tokio_postgres::Client> {
        let config: tokio_postgres::Config = connection_string
            .parse()
            .context("Invalid PostgreSQL connection string")?;

        let (client, connection) = (|| async { config.connect(NoTls).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.connect_delay)
                    .with_max_times(self.connect_attempts - 1),
            )
            .notify(|e, dur| {
                warn!(delay = ?dur, error = %e, "PostgreSQL not reachable yet, retrying...");
            })
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to PostgreSQL after {} attempts",
                    self.connect_attempts
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(client)
    }
}

impl MigrationRunner for PostgresMigrator {
    async fn run_in_transaction(&self, connection_string: &str, statements: &[String]) -> Result<()> {
        let mut client = self.connect(connection_string).await?;
        let tx = client
            .transaction()
            .await
            .context("Failed to begin migration transaction")?;

        for (i, statement) in statements.iter().enumerate() {
            if let Err(e) = tx.batch_execute(statement).await {
                let index = i + 1;
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Failed to roll back migration transaction");
                }
                return Err(RotateError::Migration {
                    index,
                    message: e.to_string(),
                }
                .into());
            }
        }

        tx.commit()
            .await
            .context("Failed to commit migration transaction")?;

        info!(statements = statements.len(), "Migrations applied");
        Ok(())
    }
}
