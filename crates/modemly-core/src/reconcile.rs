// ── Reconciler ──
//
// Pure functions from (cursor, fetched records) to (records to write,
// proposed cursor). Nothing here touches the sink or the cursor file;
// the caller commits `next_cursor` only after the sink accepts the batch.

use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, warn};

use crate::cursor::IngestionCursor;
use crate::model::{EventIdentity, EventLogEntry, SignalReading};

/// How the fetched log relates to what was already ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Continuity {
    /// Nothing ingested yet.
    FirstRun,
    /// At least one fetched entry was already known, or there was
    /// nothing to compare.
    Overlap,
    /// No fetched entry was known: the device rebooted or wiped its log.
    Discontinuity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// New entries in chronological order.
    pub to_persist: Vec<EventLogEntry>,
    pub next_cursor: IngestionCursor,
    pub continuity: Continuity,
}

/// Filter fetched entries down to the ones not yet ingested.
pub fn reconcile(cursor: &IngestionCursor, entries: Vec<EventLogEntry>) -> Reconciliation {
    let known: HashSet<&EventIdentity> = cursor.iter().collect();

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(entries.len());
    for entry in entries {
        if seen.insert(entry.identity()) {
            unique.push(entry);
        }
    }

    let overlapping = unique
        .iter()
        .filter(|entry| known.contains(&entry.identity()))
        .count();

    let continuity = if cursor.is_empty() {
        Continuity::FirstRun
    } else if unique.is_empty() || overlapping > 0 {
        Continuity::Overlap
    } else {
        warn!(
            fetched = unique.len(),
            window = cursor.len(),
            "event log shares nothing with the cursor (reboot or log reset), treating all entries as new"
        );
        Continuity::Discontinuity
    };

    let fresh: Vec<EventLogEntry> = unique
        .into_iter()
        .filter(|entry| !known.contains(&entry.identity()))
        .collect();
    let to_persist = chronological(fresh);

    let mut next_cursor = cursor.clone();
    for entry in &to_persist {
        next_cursor.remember(entry.identity());
    }

    debug!(
        %continuity,
        unique = seen.len(),
        known = overlapping,
        new = to_persist.len(),
        "reconciled event log"
    );

    Reconciliation {
        to_persist,
        next_cursor,
        continuity,
    }
}

/// Stable sort by device time. Untimed entries take the time of the
/// timed entry before them in device order; those before any timed
/// entry sort first.
fn chronological(entries: Vec<EventLogEntry>) -> Vec<EventLogEntry> {
    let mut carried: Option<DateTime<FixedOffset>> = None;
    let mut keyed: Vec<(Option<DateTime<FixedOffset>>, EventLogEntry)> = entries
        .into_iter()
        .map(|entry| {
            if entry.device_time.is_some() {
                carried = entry.device_time;
            }
            (carried, entry)
        })
        .collect();
    keyed.sort_by_key(|(at, _)| *at);
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

/// Signal readings with their collection time forced past the last
/// committed one.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedSignals {
    pub readings: Vec<SignalReading>,
    /// Latest collection time in `readings`, if any.
    pub last_signal_at: Option<DateTime<Utc>>,
}

/// Pass readings through untouched apart from keeping collection time
/// strictly increasing across cycles. A host clock that stepped
/// backwards would otherwise overwrite earlier points in a time-series
/// store.
pub fn stamp_signals(cursor: &IngestionCursor, readings: Vec<SignalReading>) -> StampedSignals {
    let floor = cursor.last_signal_at();
    let readings: Vec<SignalReading> = readings
        .into_iter()
        .map(|mut reading| {
            if let Some(floor) = floor.filter(|floor| reading.collected_at <= *floor) {
                reading.collected_at = floor + Duration::milliseconds(1);
            }
            reading
        })
        .collect();
    let last_signal_at = readings.iter().map(|r| r.collected_at).max();
    StampedSignals {
        readings,
        last_signal_at,
    }
}
