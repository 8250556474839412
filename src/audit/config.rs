//! Audit service configuration.
//!
//! Configuration-driven destination selection. Each destination is a tagged
//! variant carrying only the options its adapter reads; unrecognised keys
//! are ignored.

use crate::audit::destination::DestinationType;
use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level audit configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Batching parameters
    pub batch: BatchConfig,
    /// Retention parameters
    pub retention: RetentionConfig,
    /// Destinations, in registration order
    pub destinations: Vec<DestinationConfig>,
}

impl AuditConfig {
    /// Console plus an in-memory local store.
    pub fn development() -> Self {
        Self {
            batch: BatchConfig::default(),
            retention: RetentionConfig::default(),
            destinations: vec![
                DestinationConfig::new(DestinationKind::Console),
                DestinationConfig::new(DestinationKind::LocalStore(LocalStoreConfig::default())),
            ],
        }
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Build from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Starts from [`AuditConfig::development`] and adds the database
    /// destination when `AUDIT_ENV=production`; cloud and file destinations
    /// are added in production when their `*_ENABLED` flag is `true`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::development();
        let flag = |key: &str| lookup(key).map(|v| v == "true").unwrap_or(false);

        if let Some(size) = lookup("AUDIT_BATCH_SIZE") {
            config.batch.batch_size = parse_number("AUDIT_BATCH_SIZE", &size)?;
        }
        if let Some(timeout) = lookup("AUDIT_BATCH_TIMEOUT_MS") {
            config.batch.batch_timeout_ms = parse_number("AUDIT_BATCH_TIMEOUT_MS", &timeout)?;
        }
        if let Some(days) = lookup("AUDIT_RETENTION_DAYS") {
            config.retention.retention_days = parse_number("AUDIT_RETENTION_DAYS", &days)?;
        }

        if lookup("AUDIT_ENV").as_deref() == Some("production") {
            let endpoint = lookup("AUDIT_DB_ENDPOINT").ok_or_else(|| {
                Error::InvalidConfig("AUDIT_DB_ENDPOINT is required in production".to_string())
            })?;
            config
                .destinations
                .push(DestinationConfig::new(DestinationKind::Database(DatabaseConfig {
                    endpoint,
                    api_key: lookup("AUDIT_DB_API_KEY"),
                    ..DatabaseConfig::default()
                })));

            if flag("CLOUD_AUDIT_ENABLED") {
                let defaults = CloudConfig::default();
                config
                    .destinations
                    .push(DestinationConfig::new(DestinationKind::Cloud(CloudConfig {
                        service: lookup("CLOUD_AUDIT_SERVICE").unwrap_or(defaults.service),
                        log_group: lookup("CLOUD_AUDIT_LOG_GROUP").unwrap_or(defaults.log_group),
                        log_stream: lookup("CLOUD_AUDIT_LOG_STREAM"),
                    })));
            }

            if flag("FILE_AUDIT_ENABLED") {
                let mut file = FileConfig::default();
                if let Some(path) = lookup("FILE_AUDIT_PATH") {
                    file.path = PathBuf::from(path);
                }
                config
                    .destinations
                    .push(DestinationConfig::new(DestinationKind::File(file)));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<()> {
        self.batch.validate()?;
        self.retention.validate()?;

        let mut names = HashSet::new();
        for destination in &self.destinations {
            let name = destination.display_name();
            if !names.insert(name.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate destination name '{}'",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} must be a number, got '{}'", key, value)))
}

/// Batching configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Flush when this many entries are pending
    pub batch_size: usize,
    /// Flush this long after the first pending entry
    pub batch_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_timeout_ms: 5000,
        }
    }
}

impl BatchConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        if self.batch_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "batch_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retention configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Entries older than this are eligible for deletion
    pub retention_days: u32,
    /// Time between sweeps
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 7 * 365,
            sweep_interval_secs: 24 * 60 * 60,
        }
    }
}

impl RetentionConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_days == 0 {
            return Err(Error::InvalidConfig(
                "retention_days must be greater than 0".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One destination entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Registration name; defaults to the type tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type and type-specific options
    #[serde(flatten)]
    pub kind: DestinationKind,
    /// Request retrieval capability (defaults to whatever the adapter has)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_retrieval: Option<bool>,
    /// Request cleanup capability (defaults to whatever the adapter has)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_cleanup: Option<bool>,
}

impl DestinationConfig {
    pub fn new(kind: DestinationKind) -> Self {
        Self {
            name: None,
            kind,
            supports_retrieval: None,
            supports_cleanup: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_capabilities(mut self, retrieval: bool, cleanup: bool) -> Self {
        self.supports_retrieval = Some(retrieval);
        self.supports_cleanup = Some(cleanup);
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind.destination_type().to_string())
    }
}

/// Destination type with its options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DestinationKind {
    Console,
    LocalStore(LocalStoreConfig),
    Database(DatabaseConfig),
    File(FileConfig),
    Api(ApiConfig),
    Cloud(CloudConfig),
}

impl DestinationKind {
    pub fn destination_type(&self) -> DestinationType {
        match self {
            DestinationKind::Console => DestinationType::Console,
            DestinationKind::LocalStore(_) => DestinationType::LocalStore,
            DestinationKind::Database(_) => DestinationType::Database,
            DestinationKind::File(_) => DestinationType::File,
            DestinationKind::Api(_) => DestinationType::Api,
            DestinationKind::Cloud(_) => DestinationType::Cloud,
        }
    }
}

/// Local store configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStoreConfig {
    /// JSON file backing the store; in-memory only when unset
    pub path: Option<PathBuf>,
}

/// Audit database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Base URL of the audit API
    pub endpoint: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api".to_string(),
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

/// File destination configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory holding the log file
    pub path: PathBuf,
    /// Log file name
    pub file_name: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./audit-logs"),
            file_name: "audit-log.jsonl".to_string(),
        }
    }
}

/// External audit API configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Full URL batches are POSTed to
    pub endpoint: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Shared secret for payload signatures
    pub secret_key: Option<String>,
    /// Value of `X-Audit-Source`
    pub source: String,
    /// Request timeout
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/audit".to_string(),
            api_key: None,
            secret_key: None,
            source: "MedKey".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Cloud log service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Service name, for logs
    pub service: String,
    /// Log group
    pub log_group: String,
    /// Log stream; `audit-<date>` of the batch when unset
    pub log_stream: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            service: "AWS CloudWatch".to_string(),
            log_group: "medkey-audit-logs".to_string(),
            log_stream: None,
        }
    }
}
