// Event log: `}-{`-separated rows.
//
//   HH:MM:SS^Www Mmm DD YYYY\n^Severity^message
//   Time Not Established^Severity^message
//
// The newline after the date sometimes arrives as a literal `\n`
// escape. The message may itself contain `^`.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use super::{DeviceTimezone, Parsed, parse_rows};
use crate::error::ParseError;
use crate::model::{EventLogEntry, Severity};

const ROW_SEPARATOR: &str = "}-{";
const UNSYNCED_CLOCK: &str = "Time Not Established";

pub fn parse_event_log(
    payload: &str,
    timezone: DeviceTimezone,
    collected_at: DateTime<Utc>,
) -> Parsed<EventLogEntry> {
    parse_rows(payload, ROW_SEPARATOR, "event log", |index, row| {
        event_row(index, row, timezone, collected_at)
    })
}

fn event_row(
    index: usize,
    row: &str,
    timezone: DeviceTimezone,
    collected_at: DateTime<Utc>,
) -> Result<EventLogEntry, ParseError> {
    let row = row.replace("\\n", "\n");
    let fields: Vec<&str> = row.split('^').collect();

    let unsynced = fields
        .first()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case(UNSYNCED_CLOCK));

    // Fields taken by the timestamp before severity and message.
    let time_fields = if unsynced { 1 } else { 2 };
    if fields.len() < time_fields + 2 {
        return Err(ParseError::FieldCount {
            expected: time_fields + 2,
            found: fields.len(),
        });
    }

    let (device_time_raw, device_time) = if unsynced {
        (UNSYNCED_CLOCK.to_owned(), None)
    } else {
        let time = fields[0].trim();
        let date = normalize_whitespace(fields[1]);
        if time.is_empty() || date.is_empty() {
            return Err(ParseError::MissingField { field: "timestamp" });
        }
        let parsed = parse_device_time(time, &date).and_then(|naive| timezone.localize(naive));
        if parsed.is_none() {
            debug!(time, date = %date, "unrecognised device timestamp, keeping verbatim");
        }
        (format!("{time} {date}"), parsed)
    };

    let severity = fields[time_fields].trim();
    if severity.is_empty() {
        return Err(ParseError::MissingField { field: "severity" });
    }
    let message = fields[time_fields + 1..].join("^").trim().to_owned();

    Ok(EventLogEntry {
        sequence: u32::try_from(index).unwrap_or(u32::MAX),
        device_time_raw,
        device_time,
        severity: Severity::parse(severity),
        message,
        collected_at,
    })
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `12:34:56` + `Thu Jan 01 2026`. The weekday is ignored so a device
/// that prints the wrong one still parses.
fn parse_device_time(time: &str, date: &str) -> Option<NaiveDateTime> {
    let tokens: Vec<&str> = date.split_whitespace().collect();
    let tail = tokens.len().checked_sub(3).map(|start| &tokens[start..])?;
    let text = format!("{} {time}", tail.join(" "));
    NaiveDateTime::parse_from_str(&text, "%b %d %Y %H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid")
            .with_timezone(&Utc)
    }

    fn tuples(parsed: &Parsed<EventLogEntry>) -> Vec<(String, Severity, String)> {
        parsed
            .records()
            .iter()
            .map(|e| (e.device_time_raw.clone(), e.severity.clone(), e.message.clone()))
            .collect()
    }

    const LOG: &str = "\
        12:01:02^Sun Mar 01 2026\n^Notice (6)^Honoring MDD; IP provisioning mode = IPv6}-{\
        Time Not Established^Critical (3)^No Ranging Response received - T3 time-out;CM-MAC=aa:bb}-{\
        08:15:00^Sun Mar 01 2026\\n^Warning (5)^Dynamic Range Window violation}-{\
        08:16:00^Sun Mar 01 2026^Error (4)^";

    #[test]
    fn fixture_round_trips_identity_tuples() {
        let parsed = parse_event_log(LOG, DeviceTimezone::Utc, now());
        assert!(parsed.skipped().is_empty());
        assert_eq!(
            tuples(&parsed),
            vec![
                (
                    "12:01:02 Sun Mar 01 2026".to_owned(),
                    Severity::Notice,
                    "Honoring MDD; IP provisioning mode = IPv6".to_owned()
                ),
                (
                    "Time Not Established".to_owned(),
                    Severity::Critical,
                    "No Ranging Response received - T3 time-out;CM-MAC=aa:bb".to_owned()
                ),
                (
                    "08:15:00 Sun Mar 01 2026".to_owned(),
                    Severity::Warning,
                    "Dynamic Range Window violation".to_owned()
                ),
                (
                    "08:16:00 Sun Mar 01 2026".to_owned(),
                    Severity::Error,
                    String::new()
                ),
            ]
        );
    }

    #[test]
    fn parses_device_time_in_configured_zone() {
        let tz: DeviceTimezone = "-05:00".parse().expect("offset");
        let parsed = parse_event_log(LOG, tz, now());
        let first = &parsed.records()[0];
        assert_eq!(
            first.device_time.expect("timed").to_rfc3339(),
            "2026-03-01T12:01:02-05:00"
        );
        assert_eq!(parsed.records()[1].device_time, None);
        assert_eq!(first.sequence, 0);
        assert_eq!(parsed.records()[3].sequence, 3);
    }

    #[test]
    fn message_may_contain_carets() {
        let parsed = parse_event_log(
            "Time Not Established^Notice (6)^a^b",
            DeviceTimezone::Utc,
            now(),
        );
        assert_eq!(parsed.records()[0].message, "a^b");
    }

    #[test]
    fn unparseable_timestamp_is_kept_verbatim() {
        let parsed = parse_event_log("25:99:00^Someday^Notice (6)^odd", DeviceTimezone::Utc, now());
        let entry = &parsed.records()[0];
        assert_eq!(entry.device_time_raw, "25:99:00 Someday");
        assert_eq!(entry.device_time, None);
    }

    #[test]
    fn short_rows_are_skipped() {
        let parsed = parse_event_log(
            "12:00:00^Sun Mar 01 2026^Notice (6)}-{garbage}-{Time Not Established^^msg",
            DeviceTimezone::Utc,
            now(),
        );
        assert!(parsed.records().is_empty());
        assert_eq!(parsed.skipped().len(), 3);
        assert_eq!(
            parsed.skipped()[2].error,
            ParseError::MissingField { field: "severity" }
        );
    }

    #[test]
    fn empty_log_is_unavailable() {
        assert!(parse_event_log("", DeviceTimezone::Utc, now()).is_unavailable());
    }
}
