//! DNSimple v2 API client

use super::DnsUpdater;
use anyhow::{Context, Result};
use rds_rotate_common::DnsConfig;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const RECORD_TYPE: &str = "CNAME";

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    data: Vec<ZoneRecord>,
}

#[derive(Debug, Deserialize)]
struct ZoneRecord {
    id: u64,
}

#[derive(Debug, Serialize, PartialEq)]
struct CreateRecord<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    content: &'a str,
    ttl: u32,
}

#[derive(Debug, Serialize, PartialEq)]
struct UpdateRecord<'a> {
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

/// DNSimple client authenticating with the document's bearer token
#[derive(Clone)]
pub struct DnsimpleClient {
    http: Client,
    base_url: String,
}

impl DnsimpleClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn records_url(&self, config: &DnsConfig) -> String {
        format!(
            "{}/v2/{}/zones/{}/records",
            self.base_url, config.account_id, config.domain
        )
    }

    fn list_request(&self, config: &DnsConfig) -> RequestBuilder {
        self.http
            .get(self.records_url(config))
            .bearer_auth(&config.auth_token)
            .query(&[("name", config.record_name.as_str()), ("type", RECORD_TYPE)])
    }

    fn create_request(&self, config: &DnsConfig, target: &str) -> RequestBuilder {
        self.http
            .post(self.records_url(config))
            .bearer_auth(&config.auth_token)
            .json(&CreateRecord {
                name: &config.record_name,
                record_type: RECORD_TYPE,
                content: target,
                ttl: config.effective_ttl(),
            })
    }

    fn update_request(&self, config: &DnsConfig, record_id: u64, target: &str) -> RequestBuilder {
        self.http
            .patch(format!("{}/{}", self.records_url(config), record_id))
            .bearer_auth(&config.auth_token)
            .json(&UpdateRecord {
                name: &config.record_name,
                content: target,
                ttl: config.effective_ttl(),
            })
    }

    /// First CNAME with the configured name, if any
    async fn find_record(&self, config: &DnsConfig) -> Result<Option<u64>> {
        let response: ListRecordsResponse = self
            .list_request(config)
            .send()
            .await
            .context("Failed to list DNSimple records")?
            .error_for_status()
            .context("DNSimple rejected record listing")?
            .json()
            .await
            .context("Failed to decode DNSimple record listing")?;

        Ok(response.data.first().map(|r| r.id))
    }
}

impl DnsUpdater for DnsimpleClient {
    async fn upsert_cname(&self, config: &DnsConfig, target: &str) -> Result<()> {
        let request = match self.find_record(config).await? {
            Some(record_id) => {
                debug!(record_id, name = %config.record_name, "Updating existing CNAME");
                self.update_request(config, record_id, target)
            }
            None => {
                debug!(name = %config.record_name, "No CNAME yet, creating one");
                self.create_request(config, target)
            }
        };

        request
            .send()
            .await
            .context("Failed to send DNSimple record change")?
            .error_for_status()
            .with_context(|| {
                format!(
                    "DNSimple rejected CNAME {}.{}",
                    config.record_name, config.domain
                )
            })?;

        info!(
            record = %config.record_name,
            domain = %config.domain,
            target = %target,
            ttl = config.effective_ttl(),
            "CNAME points at new replica"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DnsConfig {
        DnsConfig {
            auth_token: "secret-token".into(),
            account_id: "1010".into(),
            domain: "example.com".into(),
            record_name: "db".into(),
            ttl: 0,
        }
    }

    fn client() -> DnsimpleClient {
        DnsimpleClient::new("https://api.sandbox.dnsimple.com/").unwrap()
    }

    #[test]
    fn test_list_request() {
        let request = client().list_request(&config()).build().unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.sandbox.dnsimple.com/v2/1010/zones/example.com/records?name=db&type=CNAME"
        );
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer secret-token"
        );
    }

    #[test]
    fn test_create_request_body() {
        let request = client()
            .create_request(&config(), "db-20240315.abc.rds.amazonaws.com")
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);

        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["type"], "CNAME");
        assert_eq!(body["name"], "db");
        assert_eq!(body["content"], "db-20240315.abc.rds.amazonaws.com");
        assert_eq!(body["ttl"], 60, "zero TTL falls back to the default");
    }

    #[test]
    fn test_update_request_targets_record() {
        let mut cfg = config();
        cfg.ttl = 300;
        let request = client().update_request(&cfg, 42, "new.example").build().unwrap();
        assert_eq!(request.method(), reqwest::Method::PATCH);
        assert!(request.url().path().ends_with("/records/42"));

        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["ttl"], 300);
        assert!(body.get("type").is_none());
    }

    #[test]
    fn test_list_response_decoding() {
        let json = r#"{"data":[{"id":7,"name":"db","type":"CNAME","content":"x"}],"pagination":{}}"#;
        let response: ListRecordsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.first().map(|r| r.id), Some(7));

        let empty: ListRecordsResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.data.is_empty());
    }
}
