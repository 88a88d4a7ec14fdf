// ── Sink writers ──
//
// A sink persists one reconciled batch per cycle. It either accepts the
// whole batch or fails; partial writes are retried in full next cycle,
// so sinks that can upsert by key should.

mod influx;
mod jsonl;
mod line_protocol;
mod memory;

use std::future::Future;

use serde::Serialize;

use crate::error::SinkError;
use crate::model::{EventLogEntry, SignalReading};

pub use influx::{InfluxConfig, InfluxSink};
pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;

/// Records produced by one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    pub signals: Vec<SignalReading>,
    pub events: Vec<EventLogEntry>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.signals.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.events.is_empty()
    }
}

/// Destination store for normalized records.
pub trait Sink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn persist(&self, batch: &Batch) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Runtime-selected sink for callers that pick the destination from
/// configuration.
#[derive(Debug, Clone)]
pub enum AnySink {
    Influx(InfluxSink),
    JsonLines(JsonLinesSink),
    Memory(MemorySink),
}

impl Sink for AnySink {
    fn name(&self) -> &'static str {
        match self {
            Self::Influx(sink) => sink.name(),
            Self::JsonLines(sink) => sink.name(),
            Self::Memory(sink) => sink.name(),
        }
    }

    async fn persist(&self, batch: &Batch) -> Result<(), SinkError> {
        match self {
            Self::Influx(sink) => sink.persist(batch).await,
            Self::JsonLines(sink) => sink.persist(batch).await,
            Self::Memory(sink) => sink.persist(batch).await,
        }
    }
}

impl From<InfluxSink> for AnySink {
    fn from(sink: InfluxSink) -> Self {
        Self::Influx(sink)
    }
}

impl From<JsonLinesSink> for AnySink {
    fn from(sink: JsonLinesSink) -> Self {
        Self::JsonLines(sink)
    }
}

impl From<MemorySink> for AnySink {
    fn from(sink: MemorySink) -> Self {
        Self::Memory(sink)
    }
}
