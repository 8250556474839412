//! Retention sweeper.
//!
//! Periodically asks every cleanup-capable destination to delete entries
//! older than the retention period. Failures are logged and reported; a
//! sweep never fails as a whole.

use crate::audit::destination::RegisteredDestination;
use crate::audit::fanout::DeliveryFailure;
use crate::core::{Clock, SystemClock, Timestamp};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of one sweep.
#[derive(Clone, Debug)]
pub struct SweepReport {
    /// Entries strictly older than this were eligible
    pub cutoff: Timestamp,
    /// Destinations that completed, with the number of entries removed
    pub cleaned: Vec<(String, u64)>,
    /// Destinations whose cleanup failed
    pub failed: Vec<DeliveryFailure>,
}

impl SweepReport {
    pub fn removed(&self) -> u64 {
        self.cleaned.iter().map(|(_, n)| n).sum()
    }
}

pub struct RetentionSweeper {
    destinations: Arc<Vec<RegisteredDestination>>,
    retention: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl RetentionSweeper {
    pub fn new(destinations: Arc<Vec<RegisteredDestination>>, retention: chrono::Duration) -> Self {
        Self {
            destinations,
            retention,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one sweep over every cleanup-capable destination.
    pub async fn sweep_once(&self) -> SweepReport {
        let cutoff = self.clock.now() - self.retention;
        let targets: Vec<&RegisteredDestination> = self
            .destinations
            .iter()
            .filter(|d| d.supports_cleanup)
            .collect();

        let tasks = targets.iter().map(|destination| {
            let adapter = destination.adapter.clone();
            tokio::spawn(async move { adapter.cleanup(cutoff).await })
        });
        let results = join_all(tasks).await;

        let mut report = SweepReport {
            cutoff,
            cleaned: Vec::new(),
            failed: Vec::new(),
        };
        for (destination, result) in targets.iter().zip(results) {
            let error = match result {
                Ok(Ok(removed)) => {
                    if removed > 0 {
                        tracing::info!(
                            destination = %destination.name,
                            removed,
                            cutoff = %cutoff.to_rfc3339(),
                            "expired audit entries removed"
                        );
                    }
                    report.cleaned.push((destination.name.clone(), removed));
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        destination = %destination.name,
                        error = %e,
                        "audit retention cleanup failed"
                    );
                    e.to_string()
                }
                Err(join_error) => {
                    tracing::error!(
                        destination = %destination.name,
                        error = %join_error,
                        "audit retention task aborted"
                    );
                    join_error.to_string()
                }
            };
            report.failed.push(DeliveryFailure {
                destination: destination.name.clone(),
                error,
            });
        }
        report
    }

    /// Sweep every `interval`, starting one interval from now.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let report = self.sweep_once().await;
                tracing::debug!(
                    removed = report.removed(),
                    failed = report.failed.len(),
                    "retention sweep finished"
                );
            }
        })
    }
}
