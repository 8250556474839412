//! Cloud log service destination.
//!
//! Shapes each batch as a log-events submission (group, stream, events with
//! millisecond timestamps) and hands it to the tracing pipeline, where the
//! deployment's log shipper forwards it. No provider SDK is linked.

use crate::audit::batch::Batch;
use crate::audit::config::CloudConfig;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::core::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One log event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Entry timestamp, epoch milliseconds
    pub timestamp: i64,
    /// Entry serialized as JSON
    pub message: String,
}

/// A log-events submission.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventsPayload {
    pub log_group: String,
    pub log_stream: String,
    pub log_events: Vec<LogEvent>,
}

pub struct CloudDestination {
    config: CloudConfig,
}

impl CloudDestination {
    pub fn new(config: CloudConfig) -> Self {
        Self { config }
    }

    /// Build the submission for `batch`.
    pub fn payload(&self, batch: &Batch) -> Result<LogEventsPayload> {
        let log_stream = match &self.config.log_stream {
            Some(stream) => stream.clone(),
            None => format!("audit-{}", batch.created_at.format("%Y-%m-%d")),
        };

        let log_events = batch
            .entries
            .iter()
            .map(|entry| -> Result<LogEvent> {
                Ok(LogEvent {
                    timestamp: entry.timestamp().timestamp_millis(),
                    message: entry.to_json()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LogEventsPayload {
            log_group: self.config.log_group.clone(),
            log_stream,
            log_events,
        })
    }
}

#[async_trait]
impl AuditDestination for CloudDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        let payload = self.payload(batch)?;
        tracing::info!(
            target: "phr_audit::cloud",
            service = %self.config.service,
            log_group = %payload.log_group,
            log_stream = %payload.log_stream,
            events = payload.log_events.len(),
            payload = %serde_json::to_string(&payload)?,
            "cloud audit submission"
        );
        Ok(())
    }

    fn kind(&self) -> DestinationType {
        DestinationType::Cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::AuditEntry;
    use crate::audit::event::EventType;
    use chrono::TimeZone;

    fn batch() -> Batch {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        let mut batch = Batch::new(vec![
            AuditEntry::builder(EventType::Read, "Patient").at(ts).build(),
            AuditEntry::builder(EventType::Update, "Encounter").at(ts).build(),
        ]);
        batch.created_at = ts;
        batch
    }

    #[test]
    fn test_payload_default_stream() {
        let cloud = CloudDestination::new(CloudConfig::default());
        let batch = batch();
        let payload = cloud.payload(&batch).unwrap();

        assert_eq!(payload.log_group, "medkey-audit-logs");
        assert_eq!(payload.log_stream, "audit-2024-03-09");
        assert_eq!(payload.log_events.len(), 2);
        assert_eq!(
            payload.log_events[0].timestamp,
            batch.entries[0].timestamp().timestamp_millis()
        );

        let decoded = AuditEntry::from_json(&payload.log_events[1].message).unwrap();
        assert_eq!(decoded, batch.entries[1]);
    }

    #[test]
    fn test_payload_configured_stream() {
        let cloud = CloudDestination::new(CloudConfig {
            log_stream: Some("phr-prod".to_string()),
            ..CloudConfig::default()
        });
        assert_eq!(cloud.payload(&batch()).unwrap().log_stream, "phr-prod");
    }

    #[tokio::test]
    async fn test_store_is_write_only() {
        let cloud = CloudDestination::new(CloudConfig::default());
        assert!(cloud.store(&batch()).await.is_ok());
        assert!(!cloud.can_retrieve());
        assert!(cloud.cleanup(chrono::Utc::now()).await.is_err());
    }
}
