//! # phr-audit - HIPAA audit logging for personal health records
//!
//! A batching, fan-out audit pipeline providing:
//! - **Audit**: entry recording, batching, destination fan-out and querying
//! - **Compliance**: HIPAA category and PHI tagging, PHI masking
//! - **Retention**: periodic pruning of entries past the retention period
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use phr_audit::audit::{AuditConfig, AuditFilter, AuditService, Details, EventType};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = AuditService::start(AuditConfig::development()).await.unwrap();
//!     service.record_event(EventType::Read, "user1", "Patient", Some("pat-9"), Details::new());
//!     service.flush().await;
//!
//!     let response = service
//!         .get_audit_logs(&AuditFilter::new().by_resource_type("Patient"))
//!         .await;
//!     println!("{} matching entries", response.logs.len());
//!     service.shutdown().await;
//! }
//! ```

pub mod audit;
pub mod compliance;
pub mod core;
pub mod logging;

pub use audit::{AuditConfig, AuditEntry, AuditFilter, AuditService, EventType, HipaaCategory};
pub use core::error::{Error, Result};
