use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Batch, Sink};
use crate::error::SinkError;
use crate::model::{EventLogEntry, SignalReading};

#[derive(Debug, Default)]
struct MemoryState {
    batches: Vec<Batch>,
    fail_next: usize,
    attempts: usize,
}

/// In-memory sink. Clones share storage, so a test can keep a handle
/// while the collector owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` writes fail.
    pub fn fail_next(&self, count: usize) {
        self.state().fail_next = count;
    }

    /// Every accepted batch, in write order.
    pub fn batches(&self) -> Vec<Batch> {
        self.state().batches.clone()
    }

    pub fn events(&self) -> Vec<EventLogEntry> {
        self.state()
            .batches
            .iter()
            .flat_map(|b| b.events.iter().cloned())
            .collect()
    }

    pub fn signals(&self) -> Vec<SignalReading> {
        self.state()
            .batches
            .iter()
            .flat_map(|b| b.signals.iter().cloned())
            .collect()
    }

    /// Writes attempted, failed ones included.
    pub fn attempts(&self) -> usize {
        self.state().attempts
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn persist(&self, batch: &Batch) -> Result<(), SinkError> {
        let mut state = self.state();
        state.attempts += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(SinkError::Unavailable {
                message: "injected failure".into(),
            });
        }
        state.batches.push(batch.clone());
        Ok(())
    }
}
