//! Collection engine between `modemly-api` and the `modemly` binary.
//!
//! - **[`SessionManager`]** owns the HNAP login lifecycle. Logins are
//!   serialized; invalidation is generation-checked so concurrent fetches
//!   never log in twice.
//!
//! - **[`Fetcher`]** pulls the event log and channel tables, re-logging in
//!   once on a rejected session and backing off on transient failures.
//!
//! - **[`parse`]** turns `^`-delimited device tables into
//!   [`SignalReading`]s and [`EventLogEntry`]s, skipping malformed rows.
//!
//! - **[`reconcile()`]** filters event-log entries against the
//!   [`IngestionCursor`] and detects log resets.
//!
//! - **[`Sink`]** implementations persist each batch; the [`Collector`]
//!   commits the cursor only after a successful write.

pub mod config;
pub mod cursor;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod reconcile;
pub mod session;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::CollectorConfig;
pub use cursor::{CursorStore, DEFAULT_WINDOW, IngestionCursor};
pub use error::{AuthError, CoreError, CursorError, FetchError, ParseError, SinkError};
pub use fetch::{FetchBatch, Fetcher, RawPayload, Resource, RetryPolicy};
pub use model::{Direction, EventIdentity, EventLogEntry, Severity, SignalReading};
pub use parse::{DeviceTimezone, ParseReport, Parsed, ParsedPayload, SkippedRow};
pub use pipeline::{Collector, CycleReport, MAX_PENDING_SIGNALS};
pub use reconcile::{Continuity, Reconciliation, StampedSignals, reconcile, stamp_signals};
pub use session::{SessionManager, ValidSession};
pub use sink::{AnySink, Batch, InfluxConfig, InfluxSink, JsonLinesSink, MemorySink, Sink};

// Re-exported so callers need not depend on `modemly-api` for TLS policy.
pub use modemly_api::TlsMode;
