//! DNS record updates pointing the deployment's name at the live replica

mod dnsimple;

pub use dnsimple::DnsimpleClient;

use anyhow::Result;
use rds_rotate_common::DnsConfig;
use std::future::Future;

/// Upserts the CNAME described by a [`DnsConfig`].
pub trait DnsUpdater: Send + Sync {
    /// Point `config.record_name` in `config.domain` at `target`, creating
    /// the record if it does not exist.
    fn upsert_cname(&self, config: &DnsConfig, target: &str)
    -> impl Future<Output = Result<()>> + Send;
}
