//! Sample rotation documents

use chrono::NaiveDate;
use rds_rotate_common::{DnsConfig, RotationState, Slot};
use std::collections::BTreeMap;

/// 2024-03-15, the date most rotation tests pin their clock to
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// Instance-shaped deployment cloned from `orders-prod`, live on
/// `orders-20240314` with `orders-20240313` as previous.
pub fn instance_document() -> RotationState {
    RotationState {
        source_identifier: "orders-prod".into(),
        target_base_identifier: "orders".into(),
        instance_class: "db.t3.medium".into(),
        availability_zone: "ap-northeast-1a".into(),
        subnet_group: "private".into(),
        publicly_accessible: false,
        security_group_ids: vec!["sg-111".into()],
        tags: BTreeMap::from([("team".to_string(), "payments".to_string())]),
        master_password: "hunter22".into(),
        dns_config: DnsConfig {
            auth_token: "token".into(),
            account_id: "1234".into(),
            domain: "example.com".into(),
            record_name: "orders-db".into(),
            ttl: 60,
        },
        migration_queries: vec![
            "UPDATE users SET email = 'redacted'".into(),
            "DELETE FROM sessions".into(),
        ],
        current: Slot::new("orders-20240314", "orders-20240314.rds.example"),
        previous: Slot::new("orders-20240313", "orders-20240313.rds.example"),
        ..Default::default()
    }
}

/// Cluster-shaped deployment cloned from `analytics-prod`, live on
/// `analytics-20240314`.
pub fn cluster_document() -> RotationState {
    RotationState {
        source_cluster_identifier: "analytics-prod".into(),
        target_cluster_base_identifier: "analytics".into(),
        instance_class: "db.r6g.large".into(),
        subnet_group: "private".into(),
        security_group_ids: vec!["sg-222".into()],
        current: Slot::new("analytics-20240314", "analytics-20240314.cluster.example"),
        previous: Slot::new("analytics-20240313", "analytics-20240313.cluster.example"),
        ..Default::default()
    }
}
