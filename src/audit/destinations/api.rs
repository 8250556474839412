//! External audit API destination.
//!
//! POSTs each batch to a third-party audit service. When a secret key is
//! configured the body carries a keyed SHA3-256 digest of the serialized
//! entries so the receiver can detect tampering in transit.

use crate::audit::batch::Batch;
use crate::audit::config::ApiConfig;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::audit::entry::AuditEntry;
use crate::core::digest::keyed_digest;
use crate::core::{now, Error, Result, Timestamp};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Protocol version sent in `X-Audit-Version`.
pub const AUDIT_API_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiPayload<'a> {
    audit_logs: &'a [AuditEntry],
    source: &'a str,
    timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

/// Forwards batches to an external audit API. Write-only.
pub struct ApiDestination {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiDestination {
    pub fn new(config: ApiConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "api endpoint must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { config, client })
    }

    /// Hex signature of `logs` under the configured secret, if any.
    pub fn sign(&self, logs: &[AuditEntry]) -> Result<Option<String>> {
        match &self.config.secret_key {
            Some(secret) => {
                let payload = serde_json::to_vec(logs)?;
                Ok(Some(keyed_digest(secret.as_bytes(), &payload).to_hex()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuditDestination for ApiDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        let payload = ApiPayload {
            audit_logs: &batch.entries,
            source: &self.config.source,
            timestamp: now(),
            signature: self.sign(&batch.entries)?,
        };

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("X-Audit-Source", &self.config.source)
            .header("X-Audit-Version", AUDIT_API_VERSION)
            .json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::destination(
                "api",
                format!("store failed: HTTP {}", status),
            ));
        }
        tracing::debug!(batch_id = %batch.id, entries = batch.len(), "audit batch forwarded");
        Ok(())
    }

    fn kind(&self) -> DestinationType {
        DestinationType::Api
    }
}
