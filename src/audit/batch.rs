//! Batching buffer.
//!
//! Decouples entry production from delivery. Entries accumulate in memory
//! and are flushed to the fan-out when either `batch_size` entries are
//! pending or `batch_timeout` has elapsed since the first pending entry,
//! whichever comes first.
//!
//! The pending list and the armed timer share one lock, so snapshot-and-clear
//! is atomic with respect to `record`: an entry lands in exactly one batch.

use crate::audit::config::BatchConfig;
use crate::audit::destination::RegisteredDestination;
use crate::audit::entry::{AuditEntry, EntryId};
use crate::audit::fanout::{DeliveryReport, FanOut};
use crate::core::digest::sha3_256_multi;
use crate::core::{now, Hash256, Result, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Unique batch identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn generate() -> Self {
        Self(format!("batch-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entries flushed together, in recorded order.
#[derive(Clone, Debug)]
pub struct Batch {
    pub id: BatchId,
    pub created_at: Timestamp,
    pub entries: Vec<AuditEntry>,
}

impl Batch {
    pub fn new(entries: Vec<AuditEntry>) -> Self {
        Self {
            id: BatchId::generate(),
            created_at: now(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA3-256 over the serialized entries.
    pub fn checksum(&self) -> Result<Hash256> {
        checksum_entries(&self.entries)
    }
}

/// SHA3-256 over a serialized entry list.
pub fn checksum_entries(entries: &[AuditEntry]) -> Result<Hash256> {
    let data = serde_json::to_vec(entries)?;
    Ok(sha3_256_multi(&[&data]))
}

/// Synchronous acknowledgment returned by `record`.
///
/// Acceptance means the entry is pending, not that it is durable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAck {
    pub accepted: bool,
    pub id: EntryId,
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Pending {
    entries: Vec<AuditEntry>,
    timer: Option<ArmedTimer>,
    next_generation: u64,
    in_flight: Vec<JoinHandle<DeliveryReport>>,
}

struct Inner {
    batch_size: usize,
    batch_timeout: Duration,
    destinations: Arc<Vec<RegisteredDestination>>,
    fanout: FanOut,
    runtime: Handle,
    pending: Mutex<Pending>,
}

/// Batching buffer in front of the destination fan-out.
#[derive(Clone)]
pub struct BatchBuffer {
    inner: Arc<Inner>,
}

impl BatchBuffer {
    /// Create a buffer delivering to `destinations`.
    ///
    /// Timers and size-triggered deliveries are spawned on `runtime`.
    pub fn new(
        config: &BatchConfig,
        destinations: Arc<Vec<RegisteredDestination>>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                batch_size: config.batch_size,
                batch_timeout: config.batch_timeout(),
                destinations,
                fanout: FanOut::new(runtime.clone()),
                runtime,
                pending: Mutex::new(Pending::default()),
            }),
        })
    }

    /// Append an entry. Never suspends and never fails.
    pub fn record(&self, entry: AuditEntry) -> RecordAck {
        let id = entry.id().clone();
        let inner = &self.inner;
        let mut pending = inner.pending.lock();
        pending.entries.push(entry);

        if pending.entries.len() >= inner.batch_size {
            if let Some(timer) = pending.timer.take() {
                timer.handle.abort();
            }
            let batch = Batch::new(std::mem::take(&mut pending.entries));
            tracing::debug!(batch_id = %batch.id, entries = batch.len(), "batch size reached");
            inner.dispatch(&mut pending, batch);
        } else if pending.timer.is_none() {
            let generation = pending.next_generation;
            pending.next_generation = pending.next_generation.wrapping_add(1);
            let task = inner.clone();
            let handle = inner.runtime.spawn(async move {
                tokio::time::sleep(task.batch_timeout).await;
                task.fire(generation);
            });
            pending.timer = Some(ArmedTimer { generation, handle });
            tracing::debug!(generation, timeout_ms = inner.batch_timeout.as_millis() as u64, "batch timer armed");
        }

        RecordAck { accepted: true, id }
    }

    /// Flush pending entries and wait for their delivery.
    ///
    /// Also waits for size- and timer-triggered deliveries still in flight.
    /// Returns `None` when nothing was pending.
    pub async fn flush(&self) -> Option<DeliveryReport> {
        let (batch, in_flight) = {
            let mut pending = self.inner.pending.lock();
            let batch = Inner::take_pending(&mut pending);
            (batch, std::mem::take(&mut pending.in_flight))
        };

        let report = match batch {
            Some(batch) => Some(
                self.inner
                    .fanout
                    .deliver(batch, &self.inner.destinations)
                    .await,
            ),
            None => None,
        };

        for handle in in_flight {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "batch delivery task failed");
            }
        }

        report
    }

    /// Number of entries waiting for a flush.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().entries.len()
    }

    /// Whether a flush timer is currently armed.
    pub fn timer_armed(&self) -> bool {
        self.inner.pending.lock().timer.is_some()
    }

    /// Total timers armed since creation.
    pub fn timers_armed(&self) -> u64 {
        self.inner.pending.lock().next_generation
    }
}

impl Inner {
    /// Deliver `batch` on its own task, tracked until the next flush.
    fn dispatch(self: &Arc<Self>, pending: &mut Pending, batch: Batch) {
        let task = self.clone();
        let handle = self
            .runtime
            .spawn(async move { task.fanout.deliver(batch, &task.destinations).await });
        pending.in_flight.retain(|h| !h.is_finished());
        pending.in_flight.push(handle);
    }

    /// Timer callback. A timer superseded since it was armed takes nothing.
    fn fire(self: &Arc<Self>, generation: u64) {
        let mut pending = self.pending.lock();
        let armed = pending.timer.as_ref().map(|timer| timer.generation);
        if armed != Some(generation) {
            return;
        }
        pending.timer = None;

        if pending.entries.is_empty() {
            return;
        }
        let batch = Batch::new(std::mem::take(&mut pending.entries));
        tracing::debug!(batch_id = %batch.id, entries = batch.len(), "batch timeout elapsed");
        self.dispatch(&mut pending, batch);
    }

    /// Snapshot and clear the pending list, disarming the timer.
    fn take_pending(pending: &mut Pending) -> Option<Batch> {
        if let Some(timer) = pending.timer.take() {
            timer.handle.abort();
        }
        if pending.entries.is_empty() {
            return None;
        }
        Some(Batch::new(std::mem::take(&mut pending.entries)))
    }
}
