//! Query engine.
//!
//! Fans a filter out to every retrieval-capable destination, merges what
//! comes back and orders it newest first.

use crate::audit::destination::RegisteredDestination;
use crate::audit::entry::AuditEntry;
use crate::audit::fanout::DeliveryFailure;
use crate::audit::filter::AuditFilter;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Merged result of one query.
#[derive(Clone, Debug, Default)]
pub struct QueryOutcome {
    /// Matching entries, newest first, paginated
    pub logs: Vec<AuditEntry>,
    /// Number of destinations asked
    pub queried: usize,
    /// Destinations whose retrieval failed
    pub failed: Vec<DeliveryFailure>,
}

impl QueryOutcome {
    /// Whether every destination asked failed.
    pub fn all_failed(&self) -> bool {
        self.queried > 0 && self.failed.len() == self.queried
    }
}

/// Response of `AuditService::get_audit_logs`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogsResponse {
    pub success: bool,
    pub logs: Vec<AuditEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Destinations that could not be read; results may be incomplete
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_destinations: Vec<String>,
}

impl From<QueryOutcome> for AuditLogsResponse {
    fn from(outcome: QueryOutcome) -> Self {
        let failed_destinations = outcome
            .failed
            .iter()
            .map(|f| f.destination.clone())
            .collect();

        if outcome.all_failed() {
            let error = outcome
                .failed
                .iter()
                .map(|f| f.error.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Self {
                success: false,
                logs: Vec::new(),
                error: Some(error),
                failed_destinations,
            };
        }

        Self {
            success: true,
            logs: outcome.logs,
            error: None,
            failed_destinations,
        }
    }
}

/// Read-side engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryEngine;

impl QueryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run `filter` against `destinations`.
    pub async fn query(
        &self,
        filter: &AuditFilter,
        destinations: &[RegisteredDestination],
    ) -> QueryOutcome {
        let readable: Vec<&RegisteredDestination> = destinations
            .iter()
            .filter(|d| d.supports_retrieval)
            .collect();
        let pushdown = filter.without_pagination();

        let tasks = readable.iter().map(|destination| {
            let adapter = destination.adapter.clone();
            let pushdown = pushdown.clone();
            tokio::spawn(async move { adapter.retrieve(&pushdown).await })
        });
        let results = join_all(tasks).await;

        let mut outcome = QueryOutcome {
            queried: readable.len(),
            ..QueryOutcome::default()
        };
        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for (destination, result) in readable.iter().zip(results) {
            let error = match result {
                Ok(Ok(entries)) => {
                    // Destinations may only push down part of the filter, and
                    // every destination holds its own copy of each entry.
                    merged.extend(
                        entries
                            .into_iter()
                            .filter(|e| pushdown.matches(e))
                            .filter(|e| seen.insert(e.id().clone())),
                    );
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        destination = %destination.name,
                        error = %e,
                        "audit retrieval failed"
                    );
                    e.to_string()
                }
                Err(join_error) => {
                    tracing::error!(
                        destination = %destination.name,
                        error = %join_error,
                        "audit retrieval task aborted"
                    );
                    join_error.to_string()
                }
            };
            outcome.failed.push(DeliveryFailure {
                destination: destination.name.clone(),
                error,
            });
        }

        // Stable: ties keep registration then append order.
        merged.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        outcome.logs = filter.paginate(merged);
        outcome
    }
}
