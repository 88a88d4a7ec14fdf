// InfluxDB line protocol encoding.
//
//   measurement,tag=value field=1.5,count=3i,text="quoted" 1700000000000000000

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::model::{Direction, EventLogEntry, SignalReading};

pub(super) enum FieldValue<'a> {
    Float(f64),
    Integer(i64),
    Unsigned(u64),
    Text(&'a str),
}

/// Builder for one line. Empty tag values are dropped because the
/// protocol cannot express them.
pub(super) struct Point<'a> {
    measurement: &'a str,
    tags: Vec<(&'a str, String)>,
    fields: Vec<(&'a str, FieldValue<'a>)>,
    timestamp_ns: Option<i64>,
}

impl<'a> Point<'a> {
    pub(super) fn new(measurement: &'a str) -> Self {
        Self {
            measurement,
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp_ns: None,
        }
    }

    pub(super) fn tag(mut self, key: &'a str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.tags.push((key, value));
        }
        self
    }

    pub(super) fn field(mut self, key: &'a str, value: FieldValue<'a>) -> Self {
        if matches!(value, FieldValue::Float(v) if !v.is_finite()) {
            return self;
        }
        self.fields.push((key, value));
        self
    }

    pub(super) fn optional(self, key: &'a str, value: Option<FieldValue<'a>>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    pub(super) fn timestamp<Tz: TimeZone>(mut self, at: &DateTime<Tz>) -> Self {
        self.timestamp_ns = at.timestamp_nanos_opt();
        self
    }

    /// Render the line, or `None` if there are no fields.
    pub(super) fn render(&self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }
        let mut line = escape(self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }
        for (index, (key, value)) in self.fields.iter().enumerate() {
            line.push(if index == 0 { ' ' } else { ',' });
            line.push_str(&escape(key, &[',', '=', ' ']));
            line.push('=');
            match value {
                FieldValue::Float(v) => {
                    let _ = write!(line, "{v}");
                }
                FieldValue::Integer(v) => {
                    let _ = write!(line, "{v}i");
                }
                FieldValue::Unsigned(v) => {
                    let _ = write!(line, "{v}i");
                }
                FieldValue::Text(v) => {
                    let _ = write!(line, "\"{}\"", escape(v, &['"', '\\']));
                }
            }
        }
        if let Some(ns) = self.timestamp_ns {
            let _ = write!(line, " {ns}");
        }
        Some(line)
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

pub(super) fn signal_point(reading: &SignalReading) -> Point<'_> {
    let (measurement, kind_tag) = match reading.direction {
        Direction::Downstream => ("downstream", "modulation"),
        Direction::Upstream => ("upstream", "channel_type"),
    };
    Point::new(measurement)
        .tag("channel", reading.channel)
        .tag("channel_id", reading.channel_id)
        .tag("lock_status", &reading.lock_status)
        .tag(kind_tag, &reading.modulation)
        .field("frequency", FieldValue::Unsigned(reading.frequency_hz))
        .field("power", FieldValue::Float(reading.power_dbmv))
        .optional("snr", reading.snr_db.map(FieldValue::Float))
        .optional("symbol_rate", reading.symbol_rate_ksps.map(FieldValue::Float))
        .optional("corrected", reading.corrected.map(FieldValue::Unsigned))
        .optional("uncorrected", reading.uncorrected.map(FieldValue::Unsigned))
        .timestamp(&reading.collected_at)
}

/// Event points are keyed by identity digest so a rewrite of the same
/// entry lands on the same series and timestamp. Untimed entries take a
/// timestamp derived from that digest, never the collection time.
pub(super) fn event_point(entry: &EventLogEntry) -> Point<'_> {
    let identity = entry.identity();
    let point = Point::new("log")
        .tag("level", entry.severity.name())
        .tag("key", identity.key())
        .field("message", FieldValue::Text(&entry.message))
        .field("device_time", FieldValue::Text(&entry.device_time_raw))
        .field("sequence", FieldValue::Integer(i64::from(entry.sequence)));
    match &entry.device_time {
        Some(at) => point.timestamp(at),
        None => point.timestamp(&identity.synthetic_time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use chrono::Utc;

    #[test]
    fn escapes_tags_and_strings() {
        let line = Point::new("log")
            .tag("level", "a b,c=d")
            .tag("empty", "")
            .field("message", FieldValue::Text("say \"hi\"\\"))
            .render()
            .expect("line");
        assert_eq!(line, r#"log,level=a\ b\,c\=d message="say \"hi\"\\""#);
    }

    #[test]
    fn integers_get_suffix_and_nan_is_dropped() {
        let line = Point::new("m")
            .field("count", FieldValue::Unsigned(3))
            .field("bad", FieldValue::Float(f64::NAN))
            .field("power", FieldValue::Float(-1.5))
            .render()
            .expect("line");
        assert_eq!(line, "m count=3i,power=-1.5");
    }

    #[test]
    fn point_without_fields_is_skipped() {
        assert!(Point::new("m").tag("a", "b").render().is_none());
    }

    fn untimed(collected_at: &str) -> EventLogEntry {
        EventLogEntry {
            sequence: 4,
            device_time_raw: "Time Not Established".into(),
            device_time: None,
            severity: Severity::Critical,
            message: "T3 time-out".into(),
            collected_at: DateTime::parse_from_rfc3339(collected_at)
                .expect("valid")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn untimed_event_point_ignores_collection_time() {
        let first = event_point(&untimed("2026-03-01T00:00:00Z"))
            .render()
            .expect("line");
        let retried = event_point(&untimed("2026-03-01T00:05:00Z"))
            .render()
            .expect("line");

        assert_eq!(first, retried);
        assert!(first.starts_with("log,level=critical,key="));
        assert!(first.contains(r#"message="T3 time-out""#));
        assert!(first.contains("sequence=4i"));
        let nanos = untimed("2026-03-01T00:00:00Z")
            .identity()
            .synthetic_time()
            .timestamp_nanos_opt()
            .expect("in range");
        assert!(first.ends_with(&format!(" {nanos}")));
    }

    #[test]
    fn timed_event_point_uses_device_time() {
        let mut entry = untimed("2026-03-01T00:05:00Z");
        entry.device_time_raw = "10:00:00 Sun Mar 01 2026".into();
        entry.device_time =
            Some(DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z").expect("valid"));
        let line = event_point(&entry).render().expect("line");
        assert!(line.ends_with(" 1772359200000000000"));
    }
}
