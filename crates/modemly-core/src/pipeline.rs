// ── Collector ──
//
// One cycle: fetch → parse → reconcile → persist → commit. The cursor
// advances only after the sink accepts the batch, so a failed write is
// recomputed and retried in full next cycle. Signal readings are not
// refetchable, so a failed batch's readings are held and sent again with
// the next one. Cancellation is checked
// between cycles; a cycle in flight always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modemly_api::HnapClient;

use crate::config::CollectorConfig;
use crate::cursor::{CursorStore, IngestionCursor};
use crate::error::{CoreError, FetchError};
use crate::fetch::{FetchBatch, Fetcher, RawPayload, Resource};
use crate::model::SignalReading;
use crate::parse::{DeviceTimezone, Parsed, ParsedPayload, parse};
use crate::reconcile::{Continuity, reconcile, stamp_signals};
use crate::session::SessionManager;
use crate::sink::{Batch, Sink};

/// Most signal readings held back after failed writes. The oldest are
/// dropped first.
pub const MAX_PENDING_SIGNALS: usize = 4096;

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Event-log entries parsed from the device.
    pub events_fetched: usize,
    /// Entries that were new and written.
    pub events_written: usize,
    pub signals_written: usize,
    pub rows_skipped: usize,
    /// Resources that produced nothing this cycle.
    pub unavailable: Vec<Resource>,
    /// `None` when the event log itself was unavailable.
    pub continuity: Option<Continuity>,
}

/// Polls one device and feeds a sink.
pub struct Collector<S> {
    fetcher: Fetcher,
    sink: S,
    store: Option<CursorStore>,
    cursor: IngestionCursor,
    pending_signals: Vec<SignalReading>,
    timezone: DeviceTimezone,
    interval: Duration,
}

impl<S: Sink> Collector<S> {
    /// Build a collector from validated configuration. The cursor starts
    /// empty and in memory until [`with_cursor_store`](Self::with_cursor_store).
    pub fn new(config: &CollectorConfig, sink: S) -> Result<Self, CoreError> {
        config.validate()?;
        let client = HnapClient::new(config.url.clone(), &config.transport())?;
        let session = SessionManager::new(client, &config.username, config.password.clone());
        Ok(Self::from_parts(
            Fetcher::new(Arc::new(session), config.retry),
            sink,
            config,
        ))
    }

    /// Assemble around an existing fetcher.
    pub fn from_parts(fetcher: Fetcher, sink: S, config: &CollectorConfig) -> Self {
        Self {
            fetcher,
            sink,
            store: None,
            cursor: IngestionCursor::new(config.window),
            pending_signals: Vec::new(),
            timezone: config.timezone,
            interval: config.interval,
        }
    }

    /// Load the cursor from `store` and save back to it on every commit.
    pub fn with_cursor_store(mut self, store: CursorStore) -> Result<Self, CoreError> {
        self.cursor = store.load(self.cursor.capacity())?;
        info!(
            path = %store.path().display(),
            remembered = self.cursor.len(),
            "cursor loaded"
        );
        self.store = Some(store);
        Ok(self)
    }

    pub fn cursor(&self) -> &IngestionCursor {
        &self.cursor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Readings from failed writes, waiting for the next cycle.
    pub fn pending_signals(&self) -> &[SignalReading] {
        &self.pending_signals
    }

    /// Run one full cycle.
    ///
    /// Fetch failures cost their resource this cycle and are reported in
    /// [`CycleReport::unavailable`]. A sink failure returns
    /// [`CoreError::Sink`] with the cursor untouched and the batch's
    /// signal readings held for the next cycle. Only rejected credentials
    /// are fatal.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CoreError> {
        let started_at = Utc::now();
        let FetchBatch {
            event_log,
            downstream,
            upstream,
        } = self.fetcher.fetch_all().await;

        let mut report = CycleReport {
            started_at,
            events_fetched: 0,
            events_written: 0,
            signals_written: 0,
            rows_skipped: 0,
            unavailable: Vec::new(),
            continuity: None,
        };

        let event_log = take(Resource::EventLog, event_log, &mut report)?;
        let downstream = take(Resource::Downstream, downstream, &mut report)?;
        let upstream = take(Resource::Upstream, upstream, &mut report)?;

        // ── Parse ──
        let mut events = None;
        let mut signals = Vec::new();
        for payload in [event_log, downstream, upstream].into_iter().flatten() {
            let resource = payload.resource;
            match parse(&payload, self.timezone) {
                ParsedPayload::Events(parsed) => {
                    events = records(resource, parsed, &mut report);
                }
                ParsedPayload::Signals(parsed) => {
                    signals.extend(records(resource, parsed, &mut report).unwrap_or_default());
                }
            }
        }

        // ── Reconcile ──
        let (to_persist, mut next_cursor) = match events {
            Some(entries) => {
                report.events_fetched = entries.len();
                let reconciliation = reconcile(&self.cursor, entries);
                report.continuity = Some(reconciliation.continuity);
                (reconciliation.to_persist, reconciliation.next_cursor)
            }
            None => (Vec::new(), self.cursor.clone()),
        };
        let stamped = stamp_signals(&self.cursor, signals);
        let mut readings = std::mem::take(&mut self.pending_signals);
        if !readings.is_empty() {
            debug!(held = readings.len(), "resending signal readings from a failed write");
        }
        readings.extend(stamped.readings);
        if let Some(at) = readings.iter().map(|r| r.collected_at).max() {
            next_cursor.set_last_signal_at(at);
        }

        let batch = Batch {
            signals: readings,
            events: to_persist,
        };

        // ── Persist, then commit ──
        if !batch.is_empty() {
            if let Err(e) = self.sink.persist(&batch).await {
                warn!(
                    sink = self.sink.name(),
                    error = %e,
                    records = batch.len(),
                    "sink write failed, cursor not advanced"
                );
                self.hold_signals(batch.signals);
                return Err(e.into());
            }
        }
        report.events_written = batch.events.len();
        report.signals_written = batch.signals.len();
        self.commit(next_cursor);

        Ok(report)
    }

    /// Run cycles on the configured interval until `cancel` fires or a
    /// fatal error occurs. The first cycle starts immediately.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), CoreError> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.run_cycle().await {
                Ok(report) => log_report(&report),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "collector stopping");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "cycle failed, will retry next interval"),
            }
        }

        info!("collector stopped");
        Ok(())
    }

    fn hold_signals(&mut self, mut readings: Vec<SignalReading>) {
        if readings.len() > MAX_PENDING_SIGNALS {
            let dropped = readings.len() - MAX_PENDING_SIGNALS;
            warn!(dropped, "too many unwritten signal readings, dropping the oldest");
            readings.drain(..dropped);
        }
        self.pending_signals = readings;
    }

    fn commit(&mut self, next: IngestionCursor) {
        if next == self.cursor {
            return;
        }
        self.cursor = next;
        if let Some(store) = &self.store {
            // The write already landed; keep the in-memory cursor ahead and
            // try the file again on the next commit.
            if let Err(e) = store.save(&self.cursor) {
                warn!(error = %e, "failed to save cursor");
            }
        }
    }
}

impl<S> std::fmt::Debug for Collector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("fetcher", &self.fetcher)
            .field("remembered", &self.cursor.len())
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Keep a payload, or record the resource as unavailable. Fatal fetch
/// errors abort the cycle.
fn take(
    resource: Resource,
    result: Result<RawPayload, FetchError>,
    report: &mut CycleReport,
) -> Result<Option<RawPayload>, CoreError> {
    match result {
        Ok(payload) => Ok(Some(payload)),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            warn!(%resource, error = %e, "skipping resource this cycle");
            report.unavailable.push(resource);
            Ok(None)
        }
    }
}

fn records<T>(resource: Resource, parsed: Parsed<T>, report: &mut CycleReport) -> Option<Vec<T>> {
    report.rows_skipped += parsed.skipped().len();
    match parsed {
        Parsed::Records(parsed) => Some(parsed.records),
        Parsed::Unavailable { reason } => {
            debug!(%resource, %reason, "resource unavailable");
            report.unavailable.push(resource);
            None
        }
    }
}

fn log_report(report: &CycleReport) {
    info!(
        events_fetched = report.events_fetched,
        events_written = report.events_written,
        signals_written = report.signals_written,
        rows_skipped = report.rows_skipped,
        unavailable = ?report.unavailable,
        continuity = ?report.continuity,
        "cycle complete"
    );
}
