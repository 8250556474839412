//! In-memory destination for unit tests.

use crate::audit::batch::Batch;
use crate::audit::destination::{AuditDestination, DestinationType};
use crate::audit::entry::AuditEntry;
use crate::audit::filter::AuditFilter;
use crate::core::{Error, Result, Timestamp};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ok,
    Fail,
    Panic,
}

/// Records every batch it receives. Can be told to fail or stall.
pub struct MemoryDestination {
    batches: Mutex<Vec<Vec<AuditEntry>>>,
    mode: Mode,
    fail_reads: bool,
    fail_cleanup: bool,
    panic_reads: bool,
    panic_cleanup: bool,
    delay: Option<Duration>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            mode: Mode::Ok,
            fail_reads: false,
            fail_cleanup: false,
            panic_reads: false,
            panic_cleanup: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: Mode::Fail,
            fail_reads: true,
            fail_cleanup: true,
            ..Self::new()
        }
    }

    pub fn panicking() -> Self {
        Self {
            mode: Mode::Panic,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn with_panicking_reads(mut self) -> Self {
        self.panic_reads = true;
        self
    }

    pub fn with_panicking_cleanup(mut self) -> Self {
        self.panic_cleanup = true;
        self
    }

    /// Seed entries as one already-stored batch.
    pub fn seeded(entries: Vec<AuditEntry>) -> Self {
        let sink = Self::new();
        sink.batches.lock().push(entries);
        sink
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl AuditDestination for MemoryDestination {
    async fn store(&self, batch: &Batch) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.mode {
            Mode::Ok => {
                self.batches.lock().push(batch.entries.clone());
                Ok(())
            }
            Mode::Fail => Err(Error::destination("memory", "simulated store failure")),
            Mode::Panic => panic!("simulated destination panic"),
        }
    }

    async fn retrieve(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        if self.panic_reads {
            panic!("simulated read panic");
        }
        if self.fail_reads {
            return Err(Error::destination("memory", "simulated read failure"));
        }
        Ok(self
            .entries()
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }

    async fn cleanup(&self, cutoff: Timestamp) -> Result<u64> {
        if self.panic_cleanup {
            panic!("simulated cleanup panic");
        }
        if self.fail_cleanup {
            return Err(Error::destination("memory", "simulated cleanup failure"));
        }
        let mut batches = self.batches.lock();
        let before: usize = batches.iter().map(Vec::len).sum();
        for batch in batches.iter_mut() {
            batch.retain(|e| e.timestamp() >= cutoff);
        }
        let after: usize = batches.iter().map(Vec::len).sum();
        Ok((before - after) as u64)
    }

    fn can_retrieve(&self) -> bool {
        true
    }

    fn can_cleanup(&self) -> bool {
        true
    }

    fn kind(&self) -> DestinationType {
        DestinationType::LocalStore
    }
}
