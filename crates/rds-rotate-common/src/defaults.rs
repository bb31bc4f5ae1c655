//! Default configuration values shared between the CLI and the orchestrator
//!
//! These constants ensure consistent defaults across all rds-rotate components.

/// Default AWS region
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// Default interval between status polls, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default poll ceiling for cluster waits (120 x 30s = 1 hour)
pub const DEFAULT_CLUSTER_MAX_ATTEMPTS: u32 = 120;

/// Default interval for the "still waiting" progress signal, in seconds
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 30;

/// Reference timezone for dated identifiers (UTC+09:00)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// Default DNS record TTL in seconds
pub const DEFAULT_DNS_TTL: u32 = 60;

/// Default DNSimple API endpoint
pub const DEFAULT_DNSIMPLE_BASE_URL: &str = "https://api.dnsimple.com";

/// Attempts made to connect to a freshly provisioned database
pub const DEFAULT_PG_CONNECT_ATTEMPTS: usize = 10;

/// Delay between database connection attempts, in seconds
pub const DEFAULT_PG_CONNECT_DELAY_SECS: u64 = 30;

/// Database name used when the descriptor carries none
pub const DEFAULT_DATABASE_NAME: &str = "postgres";

/// Suffix appended to a cluster identifier to name its writer instance
pub const CLUSTER_MEMBER_SUFFIX: &str = "-001";

/// Default instance class for new deployments
pub const DEFAULT_INSTANCE_CLASS: &str = "db.t3.medium";

/// Returns the default DNS TTL
pub fn default_dns_ttl() -> u32 {
    DEFAULT_DNS_TTL
}

/// Derive the member instance identifier for a cluster
pub fn cluster_member_identifier(cluster_identifier: &str) -> String {
    format!("{cluster_identifier}{CLUSTER_MEMBER_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_wait_budget_is_one_hour() {
        assert_eq!(
            DEFAULT_CLUSTER_MAX_ATTEMPTS as u64 * DEFAULT_POLL_INTERVAL_SECS,
            3600
        );
    }

    #[test]
    fn member_identifier() {
        assert_eq!(
            cluster_member_identifier("orders-20240315"),
            "orders-20240315-001"
        );
    }
}
