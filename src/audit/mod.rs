//! Audit pipeline
//!
//! Entries flow from [`AuditService`] through a batching buffer and are
//! fanned out to independent destinations:
//! - Console (structured log output)
//! - Local store (in memory, optionally persisted)
//! - Audit database (HTTP)
//! - Checksummed batch files
//! - External audit API
//! - Cloud log service

pub mod batch;
pub mod config;
pub mod destination;
pub mod destinations;
pub mod entry;
pub mod event;
pub mod factory;
pub mod fanout;
pub mod filter;
pub mod query;
pub mod retention;
pub mod service;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{Batch, BatchBuffer, BatchId, RecordAck};
pub use config::{AuditConfig, DestinationConfig, DestinationKind};
pub use destination::{AuditDestination, DestinationType, RegisteredDestination};
pub use entry::{AuditEntry, Details, EntryId, Provenance, ProvenanceSource};
pub use event::{EventType, HipaaCategory};
pub use factory::{create_destination, create_destinations};
pub use fanout::{DeliveryFailure, DeliveryReport};
pub use filter::AuditFilter;
pub use query::{AuditLogsResponse, QueryEngine};
pub use retention::{RetentionSweeper, SweepReport};
pub use service::AuditService;
pub use summary::AuditSummary;
