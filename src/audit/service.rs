//! Audit service.
//!
//! The single entry point host code talks to. It owns the registered
//! destinations, the batching buffer and the retention sweeper task; there
//! is no process-wide instance.

use crate::audit::batch::{BatchBuffer, RecordAck};
use crate::audit::config::AuditConfig;
use crate::audit::destination::RegisteredDestination;
use crate::audit::entry::{AuditEntry, Details, Provenance, ProvenanceSource, StaticProvenance};
use crate::audit::event::EventType;
use crate::audit::factory::create_destinations;
use crate::audit::fanout::DeliveryReport;
use crate::audit::filter::AuditFilter;
use crate::audit::query::{AuditLogsResponse, QueryEngine};
use crate::audit::retention::{RetentionSweeper, SweepReport};
use crate::audit::summary::AuditSummary;
use crate::core::{now, Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// HIPAA audit logging service.
pub struct AuditService {
    destinations: Arc<Vec<RegisteredDestination>>,
    buffer: BatchBuffer,
    query: QueryEngine,
    sweeper: Arc<RetentionSweeper>,
    sweep_interval: std::time::Duration,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    provenance: Arc<dyn ProvenanceSource>,
}

impl AuditService {
    /// Build every configured destination and start the retention sweeper.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(config: AuditConfig) -> Result<Self> {
        let destinations = create_destinations(&config).await?;
        let service = Self::with_destinations(&config, destinations)?;
        service.start_sweeper();
        tracing::info!(
            destinations = service.destinations.len(),
            batch_size = config.batch.batch_size,
            batch_timeout_ms = config.batch.batch_timeout_ms,
            retention_days = config.retention.retention_days,
            "audit service started"
        );
        Ok(service)
    }

    /// Assemble a service around already-built destinations.
    ///
    /// The sweeper is not started; call [`AuditService::sweep_now`] or
    /// [`AuditService::start_sweeper`].
    pub fn with_destinations(
        config: &AuditConfig,
        destinations: Vec<RegisteredDestination>,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("audit service needs a Tokio runtime: {}", e)))?;

        let destinations = Arc::new(destinations);
        let buffer = BatchBuffer::new(&config.batch, destinations.clone(), runtime)?;
        let sweeper = Arc::new(RetentionSweeper::new(
            destinations.clone(),
            config.retention.retention(),
        ));

        Ok(Self {
            destinations,
            buffer,
            query: QueryEngine::new(),
            sweeper,
            sweep_interval: config.retention.sweep_interval(),
            sweeper_handle: Mutex::new(None),
            provenance: Arc::new(StaticProvenance::default()),
        })
    }

    /// Take session, IP and user agent from `source` for every new entry.
    pub fn with_provenance(mut self, source: Arc<dyn ProvenanceSource>) -> Self {
        self.provenance = source;
        self
    }

    /// Start the periodic sweep if it is not already running.
    pub fn start_sweeper(&self) {
        let mut handle = self.sweeper_handle.lock();
        if handle.is_none() {
            *handle = Some(self.sweeper.clone().spawn(self.sweep_interval));
        }
    }

    /// Registered destinations, in registration order.
    pub fn destinations(&self) -> &[RegisteredDestination] {
        &self.destinations
    }

    /// Record an audit event. Never fails; delivery happens in the background.
    pub fn record_event(
        &self,
        event_type: impl Into<EventType>,
        user_id: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        details: Details,
    ) -> AuditEntry {
        let event_type = event_type.into();
        if !event_type.is_known() {
            tracing::debug!(event_type = %event_type, "unrecognised audit event type");
        }

        let mut builder = AuditEntry::builder(event_type, resource_type)
            .with_user(user_id)
            .with_details(details)
            .with_provenance(self.current_provenance());
        if let Some(resource_id) = resource_id {
            builder = builder.with_resource_id(resource_id);
        }

        let entry = builder.build();
        self.buffer.record(entry.clone());
        entry
    }

    /// Record a pre-built entry.
    pub fn record(&self, entry: AuditEntry) -> RecordAck {
        self.buffer.record(entry)
    }

    /// Query all retrieval-capable destinations.
    pub async fn get_audit_logs(&self, filter: &AuditFilter) -> AuditLogsResponse {
        let outcome = self.query.query(filter, &self.destinations).await;
        AuditLogsResponse::from(outcome)
    }

    /// Activity summary over everything retrievable.
    pub async fn summary(&self) -> Result<AuditSummary> {
        let response = self.get_audit_logs(&AuditFilter::new()).await;
        if !response.success {
            return Err(Error::destination(
                "query",
                response.error.unwrap_or_default(),
            ));
        }
        Ok(AuditSummary::from_entries(&response.logs, now()))
    }

    /// Deliver pending entries now and wait for in-flight deliveries.
    pub async fn flush(&self) -> Option<DeliveryReport> {
        self.buffer.flush().await
    }

    /// Run one retention sweep immediately.
    pub async fn sweep_now(&self) -> SweepReport {
        self.sweeper.sweep_once().await
    }

    /// Stop the sweeper and flush what is pending.
    pub async fn shutdown(&self) -> Option<DeliveryReport> {
        if let Some(handle) = self.sweeper_handle.lock().take() {
            handle.abort();
        }
        let report = self.flush().await;
        tracing::info!(
            flushed = report.as_ref().map(|r| r.entry_count).unwrap_or(0),
            "audit service stopped"
        );
        report
    }

    /// Number of entries waiting for a flush.
    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }

    fn current_provenance(&self) -> Provenance {
        self.provenance.current()
    }
}

impl Drop for AuditService {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper_handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::config::BatchConfig;
    use crate::audit::event::HipaaCategory;
    use crate::audit::testing::MemoryDestination;
    use std::time::Duration;

    fn config(batch_size: usize, batch_timeout_ms: u64) -> AuditConfig {
        AuditConfig {
            batch: BatchConfig {
                batch_size,
                batch_timeout_ms,
            },
            ..AuditConfig::default()
        }
    }

    fn service(sinks: &[Arc<MemoryDestination>], batch_size: usize) -> AuditService {
        let destinations = sinks
            .iter()
            .enumerate()
            .map(|(i, sink)| RegisteredDestination::with_defaults(&format!("mem-{}", i), sink.clone()))
            .collect();
        AuditService::with_destinations(&config(batch_size, 5000), destinations).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_entry_scenario() {
        let a = Arc::new(MemoryDestination::new());
        let b = Arc::new(MemoryDestination::new());
        let service = service(&[a.clone(), b.clone()], 10);

        service.record_event(EventType::Login, "user1", "Session", Some("sess-1"), Details::new());
        let read = service.record_event(EventType::Read, "user1", "Patient", Some("pat-9"), Details::new());
        service.record_event(
            EventType::Delete,
            "user2",
            "MedicationRequest",
            Some("med-4"),
            Details::new(),
        );

        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert!(a.batch_sizes().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(a.batch_sizes(), vec![3]);
        assert_eq!(b.batch_sizes(), vec![3]);

        let response = service
            .get_audit_logs(&AuditFilter::new().by_resource_type("Patient"))
            .await;
        assert!(response.success);
        assert_eq!(response.logs.len(), 1);
        let found = &response.logs[0];
        assert_eq!(found.id(), read.id());
        assert_eq!(found.resource_id(), Some("pat-9"));
        assert!(found.phi_involved());
        assert_eq!(found.hipaa_category(), HipaaCategory::Access);
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_accepted() {
        let sink = Arc::new(MemoryDestination::new());
        let service = service(&[sink.clone()], 10);

        let entry = service.record_event("consent_revoked", "user3", "Consent", None, Details::new());
        assert_eq!(entry.event_type(), &EventType::Other("consent_revoked".to_string()));
        assert_eq!(entry.hipaa_category(), HipaaCategory::Technical);

        service.flush().await;
        assert_eq!(sink.entries(), vec![entry]);
    }

    #[tokio::test]
    async fn test_record_event_survives_failing_destinations() {
        let healthy = Arc::new(MemoryDestination::new());
        let destinations = vec![
            RegisteredDestination::with_defaults("broken", Arc::new(MemoryDestination::failing())),
            RegisteredDestination::with_defaults("panics", Arc::new(MemoryDestination::panicking())),
            RegisteredDestination::with_defaults("healthy", healthy.clone()),
        ];
        let service = AuditService::with_destinations(&config(2, 5000), destinations).unwrap();

        service.record_event(EventType::Read, "u", "Patient", None, Details::new());
        service.record_event(EventType::Read, "u", "Patient", None, Details::new());
        service.record_event(EventType::Read, "u", "Patient", None, Details::new());

        let report = service.flush().await.unwrap();
        assert_eq!(report.entry_count, 1);
        assert_eq!(report.delivered, vec!["healthy".to_string()]);
        assert_eq!(report.failed.len(), 2);
        let mut sizes = healthy.batch_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);

        let response = service.get_audit_logs(&AuditFilter::new()).await;
        assert!(response.success);
        assert_eq!(response.logs.len(), 3);
        assert!(response.failed_destinations.contains(&"broken".to_string()));
    }

    #[tokio::test]
    async fn test_provenance_is_applied() {
        let sink = Arc::new(MemoryDestination::new());
        let provenance = Provenance::default()
            .with_session("sess-42")
            .with_ip("10.0.0.7")
            .with_user_agent("phr-web/2.1");
        let service = service(&[sink], 10)
            .with_provenance(Arc::new(StaticProvenance(provenance)));

        let entry = service.record_event(EventType::Export, "u", "DocumentReference", None, Details::new());
        assert_eq!(entry.session_id(), Some("sess-42"));
        assert_eq!(entry.ip_address(), "10.0.0.7");
        assert_eq!(entry.user_agent(), "phr-web/2.1");
    }

    #[tokio::test]
    async fn test_summary_and_sweep() {
        let old = AuditEntry::builder(EventType::Read, "Patient")
            .at(now() - chrono::Duration::days(8 * 365))
            .build();
        let sink = Arc::new(MemoryDestination::seeded(vec![old]));
        let service = service(&[sink.clone()], 10);

        service.record_event(EventType::BreachAttempt, "intruder", "Patient", None, Details::new());
        service.flush().await;

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.total_logs, 2);
        assert_eq!(summary.security_events, 1);
        assert_eq!(summary.recent_activity, 1);

        let report = service.sweep_now().await;
        assert_eq!(report.removed(), 1);
        assert_eq!(sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_fails_when_every_destination_fails() {
        let service = service(&[Arc::new(MemoryDestination::failing())], 10);
        assert!(service.summary().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_and_stops_sweeper() {
        let sink = Arc::new(MemoryDestination::new());
        let service = service(&[sink.clone()], 10);
        service.start_sweeper();

        service.record_event(EventType::Update, "u", "CarePlan", None, Details::new());
        let report = service.shutdown().await.unwrap();
        assert_eq!(report.entry_count, 1);
        assert_eq!(sink.batch_sizes(), vec![1]);
        assert!(service.sweeper_handle.lock().is_none());
        assert_eq!(service.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_timer_delivery() {
        let slow = Arc::new(MemoryDestination::new().with_delay(Duration::from_secs(10)));
        let destinations = vec![RegisteredDestination::with_defaults("slow", slow.clone())];
        let service = AuditService::with_destinations(&config(10, 1000), destinations).unwrap();

        service.record_event(EventType::Read, "u", "Patient", None, Details::new());
        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(service.pending_len(), 0);

        assert!(service.shutdown().await.is_none());
        assert_eq!(slow.batch_sizes(), vec![1]);
    }

    #[tokio::test]
    async fn test_start_with_development_config() {
        let service = AuditService::start(AuditConfig::development()).await.unwrap();
        assert_eq!(service.destinations().len(), 2);

        service.record_event(EventType::Create, "user1", "Observation", Some("obs-1"), Details::new());
        service.flush().await;

        let response = service.get_audit_logs(&AuditFilter::new()).await;
        assert!(response.success);
        assert_eq!(response.logs.len(), 1);
        service.shutdown().await;
    }

    #[test]
    fn test_requires_runtime() {
        let result = AuditService::with_destinations(&AuditConfig::default(), Vec::new());
        assert!(matches!(result, Err(Error::Runtime(_))));
    }
}
