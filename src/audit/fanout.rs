//! Destination fan-out.
//!
//! Delivers one batch to every registered destination concurrently and
//! waits for all of them to settle. Each store runs on its own task so a
//! failing or panicking adapter never affects the others, and no failure is
//! propagated to the caller. There are no retries at this layer.

use crate::audit::batch::{Batch, BatchId};
use crate::audit::destination::RegisteredDestination;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;

/// A destination that did not accept a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub destination: String,
    pub error: String,
}

/// Outcome of delivering one batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub batch_id: BatchId,
    pub entry_count: usize,
    /// Destinations that stored the batch, in registration order
    pub delivered: Vec<String>,
    /// Destinations that failed, in registration order
    pub failed: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fan-out dispatcher.
#[derive(Clone)]
pub struct FanOut {
    runtime: Handle,
}

impl FanOut {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Deliver `batch` to all `destinations`; never fails.
    pub async fn deliver(
        &self,
        batch: Batch,
        destinations: &[RegisteredDestination],
    ) -> DeliveryReport {
        let batch = Arc::new(batch);
        let batch_id = batch.id.clone();
        let entry_count = batch.len();

        let tasks = destinations.iter().map(|destination| {
            let adapter = destination.adapter.clone();
            let batch = batch.clone();
            self.runtime
                .spawn(async move { adapter.store(&batch).await })
        });
        let results = join_all(tasks).await;

        let mut report = DeliveryReport {
            batch_id,
            entry_count,
            delivered: Vec::new(),
            failed: Vec::new(),
        };

        for (destination, result) in destinations.iter().zip(results) {
            match result {
                Ok(Ok(())) => report.delivered.push(destination.name.clone()),
                Ok(Err(e)) => {
                    tracing::warn!(
                        destination = %destination.name,
                        batch_id = %report.batch_id,
                        entries = entry_count,
                        error = %e,
                        "audit batch delivery failed"
                    );
                    report.failed.push(DeliveryFailure {
                        destination: destination.name.clone(),
                        error: e.to_string(),
                    });
                }
                Err(join_error) => {
                    tracing::error!(
                        destination = %destination.name,
                        batch_id = %report.batch_id,
                        error = %join_error,
                        "audit destination task aborted"
                    );
                    report.failed.push(DeliveryFailure {
                        destination: destination.name.clone(),
                        error: join_error.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            batch_id = %report.batch_id,
            entries = entry_count,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "audit batch settled"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::AuditEntry;
    use crate::audit::event::EventType;
    use crate::audit::testing::MemoryDestination;
    use std::time::Duration;

    fn batch(n: usize) -> Batch {
        Batch::new(
            (0..n)
                .map(|_| AuditEntry::builder(EventType::Login, "Session").build())
                .collect(),
        )
    }

    fn register(name: &str, sink: Arc<MemoryDestination>) -> RegisteredDestination {
        RegisteredDestination::with_defaults(name, sink)
    }

    #[tokio::test]
    async fn test_delivers_to_all() {
        let a = Arc::new(MemoryDestination::new());
        let b = Arc::new(MemoryDestination::new());
        let fanout = FanOut::new(Handle::current());

        let report = fanout
            .deliver(batch(4), &[register("a", a.clone()), register("b", b.clone())])
            .await;

        assert!(report.is_complete());
        assert_eq!(report.delivered, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(a.batch_sizes(), vec![4]);
        assert_eq!(b.batch_sizes(), vec![4]);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let good = Arc::new(MemoryDestination::new());
        let bad = Arc::new(MemoryDestination::failing());
        let fanout = FanOut::new(Handle::current());

        let report = fanout
            .deliver(batch(2), &[register("bad", bad), register("good", good.clone())])
            .await;

        assert_eq!(good.batch_sizes(), vec![2]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].destination, "bad");
        assert!(report.failed[0].error.contains("simulated"));
    }

    #[tokio::test]
    async fn test_panicking_destination_is_isolated() {
        let good = Arc::new(MemoryDestination::new());
        let panics = Arc::new(MemoryDestination::panicking());
        let fanout = FanOut::new(Handle::current());

        let report = fanout
            .deliver(batch(1), &[register("panics", panics), register("good", good.clone())])
            .await;

        assert_eq!(good.batch_sizes(), vec![1]);
        assert_eq!(report.delivered, vec!["good".to_string()]);
        assert_eq!(report.failed[0].destination, "panics");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_destination_does_not_block_fast_one() {
        let fast = Arc::new(MemoryDestination::new());
        let slow = Arc::new(MemoryDestination::new().with_delay(Duration::from_secs(30)));
        let fanout = FanOut::new(Handle::current());

        let destinations = vec![register("slow", slow.clone()), register("fast", fast.clone())];
        let delivery = tokio::spawn(async move { fanout.deliver(batch(1), &destinations).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fast.batch_sizes(), vec![1]);
        assert!(slow.batch_sizes().is_empty());

        let report = delivery.await.unwrap();
        assert!(report.is_complete());
        assert_eq!(slow.batch_sizes(), vec![1]);
    }

    #[tokio::test]
    async fn test_no_destinations() {
        let fanout = FanOut::new(Handle::current());
        let report = fanout.deliver(batch(3), &[]).await;
        assert_eq!(report.entry_count, 3);
        assert!(report.delivered.is_empty());
        assert!(report.is_complete());
    }
}
