//! Console destination.
//!
//! Emits one structured `tracing` event per entry. Development only: it
//! keeps nothing, so it can neither be queried nor pruned.

use crate::audit::batch::Batch;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::core::Result;
use async_trait::async_trait;

/// Writes entries to the tracing subscriber.
#[derive(Debug, Default)]
pub struct ConsoleDestination;

impl ConsoleDestination {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditDestination for ConsoleDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        for entry in &batch.entries {
            tracing::info!(
                target: "phr_audit::console",
                id = %entry.id(),
                timestamp = %entry.timestamp().to_rfc3339(),
                event_type = %entry.event_type(),
                user_id = entry.user_id(),
                resource_type = entry.resource_type(),
                resource_id = entry.resource_id().unwrap_or("-"),
                ip_address = entry.ip_address(),
                hipaa_category = %entry.hipaa_category(),
                phi_involved = entry.phi_involved(),
                "AUDIT LOG"
            );
        }
        Ok(())
    }

    fn kind(&self) -> DestinationType {
        DestinationType::Console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::AuditEntry;
    use crate::audit::event::EventType;

    #[tokio::test]
    async fn test_console_store() {
        let destination = ConsoleDestination::new();
        let batch = Batch::new(vec![
            AuditEntry::builder(EventType::Login, "Session").with_user("user1").build(),
            AuditEntry::builder(EventType::Read, "Patient").with_resource_id("pat-9").build(),
        ]);
        assert!(destination.store(&batch).await.is_ok());
        assert_eq!(destination.kind(), DestinationType::Console);
        assert!(!destination.can_retrieve());
        assert!(!destination.can_cleanup());
    }
}
