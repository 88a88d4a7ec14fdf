use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Batch, Sink};
use crate::error::SinkError;
use crate::model::{EventLogEntry, SignalReading};

/// Appends one JSON object per record to a file.
///
/// There is no upsert here; duplicates are kept out by the reconciler
/// alone.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Line<'a> {
    Signal(&'a SignalReading),
    Event(&'a EventLogEntry),
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(batch: &Batch) -> Result<String, SinkError> {
        let mut out = String::new();
        let lines = batch
            .signals
            .iter()
            .map(Line::Signal)
            .chain(batch.events.iter().map(Line::Event));
        for line in lines {
            out.push_str(&serde_json::to_string(&line)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Sink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn persist(&self, batch: &Batch) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }
        let encoded = Self::encode(batch)?;

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), records = batch.len(), "appended records");
        Ok(())
    }
}
