// ── Ingestion cursor ──
//
// The bounded memory of which event-log identities have reached the
// sink. Loaded once at start, saved after every committed write.

use std::collections::VecDeque;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CursorError;
use crate::model::EventIdentity;

/// Default number of identities remembered. The device keeps a few
/// hundred log lines, so this comfortably spans several full rotations.
pub const DEFAULT_WINDOW: usize = 2048;

/// What has already been written downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionCursor {
    capacity: usize,
    /// Oldest first.
    window: VecDeque<EventIdentity>,
    last_signal_at: Option<DateTime<Utc>>,
}

impl Default for IngestionCursor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl IngestionCursor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            window: VecDeque::new(),
            last_signal_at: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn contains(&self, identity: &EventIdentity) -> bool {
        self.window.contains(identity)
    }

    /// Remembered identities, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventIdentity> {
        self.window.iter()
    }

    /// Append an identity, evicting the oldest when full.
    pub fn remember(&mut self, identity: EventIdentity) {
        self.window.push_back(identity);
        self.evict();
    }

    /// Change the window size, evicting oldest-first if it shrank.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    pub fn last_signal_at(&self) -> Option<DateTime<Utc>> {
        self.last_signal_at
    }

    pub fn set_last_signal_at(&mut self, at: DateTime<Utc>) {
        self.last_signal_at = Some(at);
    }

    fn evict(&mut self) {
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }
}

/// JSON file holding the cursor between runs.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cursor. A missing file is a first run.
    pub fn load(&self, capacity: usize) -> Result<IngestionCursor, CursorError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cursor file, starting fresh");
                return Ok(IngestionCursor::new(capacity));
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let mut cursor: IngestionCursor =
            serde_json::from_slice(&bytes).map_err(|source| CursorError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        cursor.resize(capacity);
        debug!(path = %self.path.display(), entries = cursor.len(), "cursor loaded");
        Ok(cursor)
    }

    /// Save atomically: write a temp file beside the target, then rename
    /// it over the old one.
    pub fn save(&self, cursor: &IngestionCursor) -> Result<(), CursorError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        serde_json::to_writer(&mut tmp, cursor).map_err(|source| CursorError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        tmp.flush().map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        debug!(path = %self.path.display(), entries = cursor.len(), "cursor saved");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> CursorError {
        CursorError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use pretty_assertions::assert_eq;

    fn identity(n: usize) -> EventIdentity {
        EventIdentity {
            device_time: format!("00:00:{n:02} Sun Mar 01 2026"),
            severity: Severity::Notice,
            message: format!("event {n}"),
        }
    }

    #[test]
    fn window_evicts_oldest_first() {
        let mut cursor = IngestionCursor::new(3);
        for n in 0..5 {
            cursor.remember(identity(n));
        }
        assert_eq!(cursor.len(), 3);
        assert!(!cursor.contains(&identity(1)));
        assert_eq!(
            cursor.iter().cloned().collect::<Vec<_>>(),
            vec![identity(2), identity(3), identity(4)]
        );
    }

    #[test]
    fn shrinking_evicts_oldest() {
        let mut cursor = IngestionCursor::new(4);
        for n in 0..4 {
            cursor.remember(identity(n));
        }
        cursor.resize(2);
        assert_eq!(
            cursor.iter().cloned().collect::<Vec<_>>(),
            vec![identity(2), identity(3)]
        );
    }

    #[test]
    fn missing_file_is_empty_cursor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CursorStore::new(dir.path().join("absent.json"));
        let cursor = store.load(16).expect("load");
        assert!(cursor.is_empty());
        assert_eq!(cursor.capacity(), 16);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CursorStore::new(dir.path().join("nested").join("cursor.json"));

        let mut cursor = IngestionCursor::new(8);
        cursor.remember(identity(1));
        cursor.remember(identity(2));
        cursor.set_last_signal_at(
            DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .expect("valid")
                .with_timezone(&Utc),
        );
        store.save(&cursor).expect("save");

        assert_eq!(store.load(8).expect("load"), cursor);
    }

    #[test]
    fn save_replaces_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CursorStore::new(dir.path().join("cursor.json"));

        let mut cursor = IngestionCursor::new(8);
        store.save(&cursor).expect("first save");
        cursor.remember(identity(7));
        store.save(&cursor).expect("second save");

        let loaded = store.load(8).expect("load");
        assert!(loaded.contains(&identity(7)));
        let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cursor.json");
        std::fs::write(&path, b"{not json").expect("write");
        let err = CursorStore::new(&path).load(8).expect_err("corrupt");
        assert!(matches!(err, CursorError::Corrupt { .. }));
    }
}
