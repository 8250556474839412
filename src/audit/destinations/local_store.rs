//! Local store destination.
//!
//! An ordered, append-only collection of entries. With a `path` configured
//! the whole collection is written as a JSON array after every change and
//! reloaded on startup; without one it lives in memory only.

use crate::audit::batch::Batch;
use crate::audit::config::LocalStoreConfig;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::audit::entry::AuditEntry;
use crate::audit::filter::AuditFilter;
use crate::core::{now, Result, Timestamp};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Local ordered store.
pub struct LocalStoreDestination {
    /// JSON file backing the store
    path: Option<PathBuf>,
    /// Entries, in append order
    entries: Mutex<Vec<AuditEntry>>,
    /// Entries older than this are dropped on write
    retention: Option<chrono::Duration>,
}

impl LocalStoreDestination {
    /// Create a store with no file backing.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
            retention: None,
        }
    }

    /// Create a store, loading any existing file.
    pub async fn new(config: LocalStoreConfig) -> Result<Self> {
        let entries = match &config.path {
            Some(path) => load(path).await?,
            None => Vec::new(),
        };
        Ok(Self {
            path: config.path,
            entries: Mutex::new(entries),
            retention: None,
        })
    }

    /// Drop entries past `retention` whenever a batch is stored.
    pub fn with_retention(mut self, retention: chrono::Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Snapshot of every stored entry.
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }

    async fn persist(&self, entries: &[AuditEntry]) -> Result<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let json = serde_json::to_vec(entries)?;
            tokio::fs::write(path, json).await?;
        }
        Ok(())
    }
}

/// Read a persisted store; a missing file is an empty store.
pub async fn load(path: &Path) -> Result<Vec<AuditEntry>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl AuditDestination for LocalStoreDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.extend(batch.entries.iter().cloned());

        if let Some(retention) = self.retention {
            let cutoff = now() - retention;
            entries.retain(|e| e.timestamp() > cutoff);
        }

        self.persist(&entries).await
    }

    async fn retrieve(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn cleanup(&self, cutoff: Timestamp) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| e.timestamp() >= cutoff);
        let removed = before - entries.len();

        if removed > 0 {
            self.persist(&entries).await?;
        }
        Ok(removed as u64)
    }

    fn can_retrieve(&self) -> bool {
        true
    }

    fn can_cleanup(&self) -> bool {
        true
    }

    fn kind(&self) -> DestinationType {
        DestinationType::LocalStore
    }
}
