//! File destination.
//!
//! Appends one JSON line per batch to `<path>/<file_name>`. Each line
//! carries a SHA3-256 checksum of its entries; lines that fail verification
//! are skipped on read and reported.

use crate::audit::batch::{checksum_entries, Batch};
use crate::audit::config::FileConfig;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::audit::entry::AuditEntry;
use crate::audit::filter::AuditFilter;
use crate::core::{now, Result, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One stored batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub batch_id: String,
    pub timestamp: Timestamp,
    pub logs: Vec<AuditEntry>,
    pub checksum: String,
}

impl BatchRecord {
    fn new(batch_id: &str, logs: Vec<AuditEntry>) -> Result<Self> {
        let checksum = checksum_entries(&logs)?.to_hex();
        Ok(Self {
            batch_id: batch_id.to_string(),
            timestamp: now(),
            logs,
            checksum,
        })
    }

    /// Whether the checksum still matches the entries.
    pub fn verify(&self) -> bool {
        checksum_entries(&self.logs)
            .map(|hash| hash.to_hex() == self.checksum)
            .unwrap_or(false)
    }
}

/// JSON-lines batch file.
pub struct FileDestination {
    config: FileConfig,
    /// Serialises appends and rewrites
    lock: Mutex<()>,
}

impl FileDestination {
    pub fn new(config: FileConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    /// Full path of the log file.
    pub fn file_path(&self) -> PathBuf {
        self.config.path.join(&self.config.file_name)
    }

    /// Read every intact batch record, in file order.
    pub async fn read_records(&self) -> Result<Vec<BatchRecord>> {
        let _guard = self.lock.lock().await;
        self.read_records_locked().await
    }

    async fn read_records_locked(&self) -> Result<Vec<BatchRecord>> {
        let path = self.file_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<BatchRecord>(line) {
                Ok(record) if record.verify() => records.push(record),
                Ok(record) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        batch_id = %record.batch_id,
                        "audit batch checksum mismatch; skipping"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        error = %e,
                        "unreadable audit batch line; skipping"
                    );
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl AuditDestination for FileDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        let record = BatchRecord::new(batch.id.as_str(), batch.entries.clone())?;
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.config.path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn retrieve(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let records = self.read_records().await?;
        Ok(records
            .into_iter()
            .flat_map(|record| record.logs)
            .filter(|entry| filter.matches(entry))
            .collect())
    }

    async fn cleanup(&self, cutoff: Timestamp) -> Result<u64> {
        let _guard = self.lock.lock().await;
        let records = self.read_records_locked().await?;

        let mut removed = 0u64;
        let mut content = Vec::new();
        for record in records {
            let before = record.logs.len();
            let kept: Vec<AuditEntry> = record
                .logs
                .into_iter()
                .filter(|e| e.timestamp() >= cutoff)
                .collect();
            removed += (before - kept.len()) as u64;
            if kept.is_empty() {
                continue;
            }
            let rewritten = if kept.len() == before {
                BatchRecord {
                    logs: kept,
                    ..record
                }
            } else {
                BatchRecord {
                    timestamp: record.timestamp,
                    ..BatchRecord::new(&record.batch_id, kept)?
                }
            };
            content.extend(serde_json::to_vec(&rewritten)?);
            content.push(b'\n');
        }

        if removed > 0 {
            let path = self.file_path();
            let tmp = path.with_extension("jsonl.tmp");
            tokio::fs::write(&tmp, &content).await?;
            tokio::fs::rename(&tmp, &path).await?;
        }
        Ok(removed)
    }

    fn can_retrieve(&self) -> bool {
        true
    }

    fn can_cleanup(&self) -> bool {
        true
    }

    fn kind(&self) -> DestinationType {
        DestinationType::File
    }
}
