//! Migration runner tests against a real PostgreSQL server
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! POSTGRES_URL=postgres://postgres@localhost/postgres cargo test --test postgres_integration -- --ignored
//! ```
//!
//! Each test works on its own scratch table and drops it afterwards.

use rds_rotate::RotateError;
use rds_rotate::migrate::{MigrationRunner, PostgresMigrator};
use std::time::Duration;
use tokio_postgres::{Client, NoTls};

fn postgres_url(test: &str) -> Option<String> {
    match std::env::var("POSTGRES_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("skipping {test} because POSTGRES_URL is not set");
            None
        }
    }
}

async fn connect(url: &str) -> Client {
    let (client, connection) = tokio_postgres::connect(url, NoTls)
        .await
        .expect("POSTGRES_URL should point at a reachable server");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            panic!("connection error: {e}");
        }
    });
    client
}

/// Create a one-column table holding a single row
async fn scratch_table(client: &Client, name: &str) -> String {
    let table = format!("rotate_{name}_{}", std::process::id());
    client
        .batch_execute(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (email text NOT NULL);
             INSERT INTO {table} VALUES ('alice@example.com');"
        ))
        .await
        .unwrap();
    table
}

async fn emails(client: &Client, table: &str) -> Vec<String> {
    client
        .query(&format!("SELECT email FROM {table} ORDER BY email"), &[])
        .await
        .unwrap()
        .iter()
        .map(|row| row.get(0))
        .collect()
}

fn migrator() -> PostgresMigrator {
    PostgresMigrator::new(1, Duration::from_secs(1))
}

#[tokio::test]
#[ignore]
async fn test_failing_statement_rolls_back_earlier_ones() {
    let Some(url) = postgres_url("test_failing_statement_rolls_back_earlier_ones") else {
        return;
    };
    let client = connect(&url).await;
    let table = scratch_table(&client, "rollback").await;

    let statements = vec![
        format!("UPDATE {table} SET email = 'redacted'"),
        format!("UPDATE {table} SET no_such_column = 1"),
        format!("DELETE FROM {table}"),
    ];
    let err = migrator()
        .run_in_transaction(&url, &statements)
        .await
        .unwrap_err();

    match RotateError::find(&err) {
        Some(RotateError::Migration { index, message }) => {
            assert_eq!(*index, 2);
            assert!(message.contains("no_such_column"), "{message}");
        }
        other => panic!("expected a migration error, got {other:?}"),
    }

    // Statement 1 succeeded inside the transaction but was never committed
    assert_eq!(emails(&client, &table).await, vec!["alice@example.com"]);

    client
        .batch_execute(&format!("DROP TABLE {table}"))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_all_statements_commit_together() {
    let Some(url) = postgres_url("test_all_statements_commit_together") else {
        return;
    };
    let client = connect(&url).await;
    let table = scratch_table(&client, "commit").await;

    let statements = vec![
        format!("UPDATE {table} SET email = 'redacted'"),
        format!("INSERT INTO {table} VALUES ('bob@example.com')"),
    ];
    migrator()
        .run_in_transaction(&url, &statements)
        .await
        .unwrap();

    assert_eq!(
        emails(&client, &table).await,
        vec!["bob@example.com", "redacted"]
    );

    client
        .batch_execute(&format!("DROP TABLE {table}"))
        .await
        .unwrap();
}
