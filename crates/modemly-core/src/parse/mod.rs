// ── Parser / normalizer ──
//
// Turns the device's `^`-delimited tables into typed records. Parsing
// is tolerant: a malformed row is skipped and reported, never fatal.
// An empty payload means the resource was unavailable, which callers
// must be able to tell apart from "nothing new".

mod channels;
mod event_log;
mod timezone;
pub mod units;

use tracing::warn;

use crate::error::ParseError;
use crate::fetch::{RawPayload, Resource};
use crate::model::{EventLogEntry, SignalReading};

pub use channels::{parse_downstream, parse_upstream};
pub use event_log::parse_event_log;
pub use timezone::DeviceTimezone;

/// A row the parser could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based row position in the payload.
    pub index: usize,
    pub raw: String,
    pub error: ParseError,
}

/// Records parsed from one payload plus the rows that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRow>,
}

impl<T> Default for ParseReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Outcome of parsing one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Records(ParseReport<T>),
    /// The device returned nothing usable for this resource.
    Unavailable { reason: String },
}

impl<T> Parsed<T> {
    pub fn records(&self) -> &[T] {
        match self {
            Self::Records(report) => &report.records,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        match self {
            Self::Records(report) => &report.skipped,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn into_records(self) -> Vec<T> {
        match self {
            Self::Records(report) => report.records,
            Self::Unavailable { .. } => Vec::new(),
        }
    }
}

/// Parsed payload of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    Signals(Parsed<SignalReading>),
    Events(Parsed<EventLogEntry>),
}

/// Parse a payload according to the resource it was fetched from.
pub fn parse(payload: &RawPayload, timezone: DeviceTimezone) -> ParsedPayload {
    match payload.resource {
        Resource::EventLog => ParsedPayload::Events(parse_event_log(
            &payload.body,
            timezone,
            payload.collected_at,
        )),
        Resource::Downstream => {
            ParsedPayload::Signals(parse_downstream(&payload.body, payload.collected_at))
        }
        Resource::Upstream => {
            ParsedPayload::Signals(parse_upstream(&payload.body, payload.collected_at))
        }
    }
}

/// Shared row loop: split, skip blanks, collect records and failures.
pub(crate) fn parse_rows<T>(
    payload: &str,
    separator: &str,
    resource: &str,
    mut parse_row: impl FnMut(usize, &str) -> Result<T, ParseError>,
) -> Parsed<T> {
    if payload.trim().is_empty() {
        return Parsed::Unavailable {
            reason: format!("device returned an empty {resource} payload"),
        };
    }

    let mut report = ParseReport::default();
    for (index, row) in payload
        .split(separator)
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .enumerate()
    {
        match parse_row(index, row) {
            Ok(record) => report.records.push(record),
            Err(error) => {
                warn!(resource, index, %error, row, "skipping malformed row");
                report.skipped.push(SkippedRow {
                    index,
                    raw: row.to_owned(),
                    error,
                });
            }
        }
    }
    Parsed::Records(report)
}

/// Split a row on `^`, trimming each field and dropping the empty tail
/// left by a trailing separator.
pub(crate) fn split_fields(row: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = row.split('^').map(str::trim).collect();
    while fields.last().is_some_and(|field| field.is_empty()) {
        fields.pop();
    }
    fields
}
