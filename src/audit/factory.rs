//! Destination factory.
//!
//! Turns configuration entries into registered adapters.

use crate::audit::config::{AuditConfig, DestinationConfig, DestinationKind};
use crate::audit::destination::{AuditDestination, RegisteredDestination};
use crate::audit::destinations::{
    ApiDestination, CloudDestination, ConsoleDestination, DatabaseDestination, FileDestination,
    LocalStoreDestination,
};
use crate::core::Result;
use std::sync::Arc;

/// Create one destination from configuration.
///
/// The local store also prunes on write using `retention`.
pub async fn create_destination(
    config: &DestinationConfig,
    retention: chrono::Duration,
) -> Result<RegisteredDestination> {
    let adapter: Arc<dyn AuditDestination> = match &config.kind {
        DestinationKind::Console => Arc::new(ConsoleDestination::new()),
        DestinationKind::LocalStore(local) => Arc::new(
            LocalStoreDestination::new(local.clone())
                .await?
                .with_retention(retention),
        ),
        DestinationKind::Database(db) => Arc::new(DatabaseDestination::new(db.clone())?),
        DestinationKind::File(file) => Arc::new(FileDestination::new(file.clone())),
        DestinationKind::Api(api) => Arc::new(ApiDestination::new(api.clone())?),
        DestinationKind::Cloud(cloud) => Arc::new(CloudDestination::new(cloud.clone())),
    };

    let name = config.display_name();
    let retrieval = config
        .supports_retrieval
        .unwrap_or_else(|| adapter.can_retrieve());
    let cleanup = config
        .supports_cleanup
        .unwrap_or_else(|| adapter.can_cleanup());
    Ok(RegisteredDestination::new(&name, adapter, retrieval, cleanup))
}

/// Create every configured destination, in configuration order.
pub async fn create_destinations(config: &AuditConfig) -> Result<Vec<RegisteredDestination>> {
    config.validate()?;
    let retention = config.retention.retention();

    let mut destinations = Vec::with_capacity(config.destinations.len());
    for destination in &config.destinations {
        let registered = create_destination(destination, retention).await?;
        tracing::info!(
            destination = %registered.name,
            kind = %registered.kind(),
            retrieval = registered.supports_retrieval,
            cleanup = registered.supports_cleanup,
            "audit destination registered"
        );
        destinations.push(registered);
    }
    Ok(destinations)
}
