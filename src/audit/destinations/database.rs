//! Audit database destination.
//!
//! Talks to a secured audit database through its HTTP API:
//! - `POST   {endpoint}/audit-logs`          store a batch
//! - `GET    {endpoint}/audit-logs?<filter>` query entries
//! - `DELETE {endpoint}/audit-logs/cleanup`  prune by cutoff

use crate::audit::batch::Batch;
use crate::audit::config::DatabaseConfig;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::audit::entry::AuditEntry;
use crate::audit::filter::AuditFilter;
use crate::core::{now, Error, Result, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of a store request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreRequest<'a> {
    logs: &'a [AuditEntry],
    batch_id: &'a str,
    timestamp: Timestamp,
}

/// Body of a query response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    logs: Vec<AuditEntry>,
}

/// Body of a cleanup request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupRequest {
    cutoff_date: Timestamp,
}

/// Body of a cleanup response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CleanupResponse {
    deleted: Option<u64>,
}

/// HTTP-backed audit database.
pub struct DatabaseDestination {
    config: DatabaseConfig,
    client: reqwest::Client,
}

impl DatabaseDestination {
    /// Create a new database destination.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "database endpoint must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { config, client })
    }

    /// Get the base endpoint.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn check(&self, response: &reqwest::Response, operation: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::destination(
                "database",
                format!("{} failed: HTTP {}", operation, status),
            ))
        }
    }
}

#[async_trait]
impl AuditDestination for DatabaseDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        let body = StoreRequest {
            logs: &batch.entries,
            batch_id: batch.id.as_str(),
            timestamp: now(),
        };
        let response = self
            .authorize(self.client.post(self.url("audit-logs")))
            .json(&body)
            .send()
            .await?;
        self.check(&response, "store")
    }

    async fn retrieve(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let response = self
            .authorize(self.client.get(self.url("audit-logs")))
            .query(&filter.to_query_pairs())
            .send()
            .await?;
        self.check(&response, "retrieve")?;
        let body: QueryResponse = response.json().await?;
        Ok(body.logs)
    }

    async fn cleanup(&self, cutoff: Timestamp) -> Result<u64> {
        let response = self
            .authorize(self.client.delete(self.url("audit-logs/cleanup")))
            .json(&CleanupRequest { cutoff_date: cutoff })
            .send()
            .await?;
        self.check(&response, "cleanup")?;

        // Servers are not required to report a count.
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(0);
        }
        let body: CleanupResponse = serde_json::from_slice(&bytes).unwrap_or_default();
        Ok(body.deleted.unwrap_or(0))
    }

    fn can_retrieve(&self) -> bool {
        true
    }

    fn can_cleanup(&self) -> bool {
        true
    }

    fn kind(&self) -> DestinationType {
        DestinationType::Database
    }
}
