//! AuditDestination trait definition.
//!
//! Core trait that every audit sink implements. Storing is mandatory;
//! retrieval and cleanup are optional capabilities probed through
//! `can_retrieve` / `can_cleanup`.

use crate::audit::batch::Batch;
use crate::audit::entry::AuditEntry;
use crate::audit::filter::AuditFilter;
use crate::core::{Error, Result, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Destination type identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationType {
    /// Structured log output
    Console,
    /// Local ordered store, optionally persisted to a JSON file
    LocalStore,
    /// Remote audit database behind an HTTP API
    Database,
    /// Append-only batch files
    File,
    /// External audit system
    Api,
    /// Cloud log service
    Cloud,
}

impl std::fmt::Display for DestinationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestinationType::Console => write!(f, "console"),
            DestinationType::LocalStore => write!(f, "local-store"),
            DestinationType::Database => write!(f, "database"),
            DestinationType::File => write!(f, "file"),
            DestinationType::Api => write!(f, "api"),
            DestinationType::Cloud => write!(f, "cloud"),
        }
    }
}

/// Core trait for audit destinations.
#[async_trait]
pub trait AuditDestination: Send + Sync {
    /// Persist a batch, preserving entry order.
    async fn store(&self, batch: &Batch) -> Result<()>;

    /// Return stored entries matching `filter`.
    ///
    /// Implementations may push down only part of the filter; callers
    /// re-apply it locally.
    async fn retrieve(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        Err(Error::unsupported(&self.kind().to_string(), "retrieve"))
    }

    /// Delete every entry with `timestamp < cutoff`.
    ///
    /// Returns the number of entries removed when the destination knows it.
    async fn cleanup(&self, _cutoff: Timestamp) -> Result<u64> {
        Err(Error::unsupported(&self.kind().to_string(), "cleanup"))
    }

    /// Whether `retrieve` is implemented.
    fn can_retrieve(&self) -> bool {
        false
    }

    /// Whether `cleanup` is implemented.
    fn can_cleanup(&self) -> bool {
        false
    }

    /// Get the destination type.
    fn kind(&self) -> DestinationType;
}

/// A destination as registered with the service.
#[derive(Clone)]
pub struct RegisteredDestination {
    /// Name used in logs and error reports
    pub name: String,
    /// Effective retrieval capability
    pub supports_retrieval: bool,
    /// Effective cleanup capability
    pub supports_cleanup: bool,
    /// The adapter
    pub adapter: Arc<dyn AuditDestination>,
}

impl RegisteredDestination {
    /// Register `adapter`, granting whichever requested capabilities it
    /// actually has.
    pub fn new(
        name: &str,
        adapter: Arc<dyn AuditDestination>,
        supports_retrieval: bool,
        supports_cleanup: bool,
    ) -> Self {
        if supports_retrieval && !adapter.can_retrieve() {
            tracing::warn!(destination = name, kind = %adapter.kind(), "retrieval requested but not supported; disabled");
        }
        if supports_cleanup && !adapter.can_cleanup() {
            tracing::warn!(destination = name, kind = %adapter.kind(), "cleanup requested but not supported; disabled");
        }

        Self {
            name: name.to_string(),
            supports_retrieval: supports_retrieval && adapter.can_retrieve(),
            supports_cleanup: supports_cleanup && adapter.can_cleanup(),
            adapter,
        }
    }

    /// Register with every capability the adapter has.
    pub fn with_defaults(name: &str, adapter: Arc<dyn AuditDestination>) -> Self {
        let retrieval = adapter.can_retrieve();
        let cleanup = adapter.can_cleanup();
        Self::new(name, adapter, retrieval, cleanup)
    }

    pub fn kind(&self) -> DestinationType {
        self.adapter.kind()
    }
}

impl std::fmt::Debug for RegisteredDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredDestination")
            .field("name", &self.name)
            .field("kind", &self.adapter.kind())
            .field("supports_retrieval", &self.supports_retrieval)
            .field("supports_cleanup", &self.supports_cleanup)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::destinations::{ConsoleDestination, LocalStoreDestination};

    #[test]
    fn test_destination_type_display() {
        assert_eq!(DestinationType::Console.to_string(), "console");
        assert_eq!(DestinationType::LocalStore.to_string(), "local-store");
        assert_eq!(DestinationType::Database.to_string(), "database");
        assert_eq!(DestinationType::File.to_string(), "file");
        assert_eq!(DestinationType::Api.to_string(), "api");
        assert_eq!(DestinationType::Cloud.to_string(), "cloud");
    }

    #[test]
    fn test_destination_type_serde() {
        let parsed: DestinationType = serde_json::from_str("\"local-store\"").unwrap();
        assert_eq!(parsed, DestinationType::LocalStore);
    }

    #[test]
    fn test_capabilities_are_narrowed() {
        let console = RegisteredDestination::new("console", Arc::new(ConsoleDestination::new()), true, true);
        assert!(!console.supports_retrieval);
        assert!(!console.supports_cleanup);

        let local = RegisteredDestination::new(
            "local",
            Arc::new(LocalStoreDestination::in_memory()),
            true,
            false,
        );
        assert!(local.supports_retrieval);
        assert!(!local.supports_cleanup);
    }

    #[tokio::test]
    async fn test_default_retrieve_is_unsupported() {
        let console = ConsoleDestination::new();
        let err = console.retrieve(&AuditFilter::new()).await.unwrap_err();
        assert!(matches!(err, Error::Unsupported { operation: "retrieve", .. }));
        let err = console.cleanup(crate::core::now()).await.unwrap_err();
        assert!(matches!(err, Error::Unsupported { operation: "cleanup", .. }));
    }
}
