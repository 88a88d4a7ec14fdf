// Channel tables: `|+|`-separated rows of `^`-separated fields.
//
// Downstream: channel^lock^modulation^channel_id^freq^power^snr^corrected^uncorrected^
// Upstream:   channel^lock^channel_type^channel_id^symbol_rate^freq^power^

use chrono::{DateTime, Utc};

use super::units;
use super::{Parsed, parse_rows, split_fields};
use crate::error::ParseError;
use crate::model::{Direction, SignalReading};

const ROW_SEPARATOR: &str = "|+|";
const DOWNSTREAM_MIN_FIELDS: usize = 7;
const UPSTREAM_MIN_FIELDS: usize = 7;

pub fn parse_downstream(payload: &str, collected_at: DateTime<Utc>) -> Parsed<SignalReading> {
    parse_rows(payload, ROW_SEPARATOR, "downstream", |_, row| {
        downstream_row(row, collected_at)
    })
}

pub fn parse_upstream(payload: &str, collected_at: DateTime<Utc>) -> Parsed<SignalReading> {
    parse_rows(payload, ROW_SEPARATOR, "upstream", |_, row| {
        upstream_row(row, collected_at)
    })
}

fn require(fields: &[&str], expected: usize) -> Result<(), ParseError> {
    if fields.len() < expected {
        return Err(ParseError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn text(field: &'static str, value: &str) -> Result<String, ParseError> {
    if value.is_empty() {
        return Err(ParseError::MissingField { field });
    }
    Ok(value.to_owned())
}

/// Optional trailing counter: absent or blank is `None`, garbage is an error.
fn optional_counter(field: &'static str, value: Option<&&str>) -> Result<Option<u64>, ParseError> {
    match value {
        Some(raw) if !raw.is_empty() => units::counter(field, raw).map(Some),
        _ => Ok(None),
    }
}

fn downstream_row(row: &str, collected_at: DateTime<Utc>) -> Result<SignalReading, ParseError> {
    let fields = split_fields(row);
    require(&fields, DOWNSTREAM_MIN_FIELDS)?;

    Ok(SignalReading {
        direction: Direction::Downstream,
        channel: units::identifier("channel", fields[0])?,
        lock_status: text("lock status", fields[1])?,
        modulation: text("modulation", fields[2])?,
        channel_id: units::identifier("channel id", fields[3])?,
        frequency_hz: units::frequency_hz(fields[4])?,
        power_dbmv: units::power_dbmv(fields[5])?,
        snr_db: Some(units::snr_db(fields[6])?),
        symbol_rate_ksps: None,
        corrected: optional_counter("corrected", fields.get(7))?,
        uncorrected: optional_counter("uncorrected", fields.get(8))?,
        collected_at,
    })
}

fn upstream_row(row: &str, collected_at: DateTime<Utc>) -> Result<SignalReading, ParseError> {
    let fields = split_fields(row);
    require(&fields, UPSTREAM_MIN_FIELDS)?;

    Ok(SignalReading {
        direction: Direction::Upstream,
        channel: units::identifier("channel", fields[0])?,
        lock_status: text("lock status", fields[1])?,
        modulation: text("channel type", fields[2])?,
        channel_id: units::identifier("channel id", fields[3])?,
        symbol_rate_ksps: Some(units::symbol_rate_ksps(fields[4])?),
        frequency_hz: units::frequency_hz(fields[5])?,
        power_dbmv: units::power_dbmv(fields[6])?,
        snr_db: None,
        corrected: None,
        uncorrected: None,
        collected_at,
    })
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOWNSTREAM: &str = "1^Locked^QAM256^20^573.0^ 3.1^40.9^5^0^|+|\
        2^Locked^QAM256^1^477.0^2.4^40.3^12^3^|+|\
        33^Locked^OFDM PLC^193^957.0^-1.2^39.0^1500^0^";

    const UPSTREAM: &str = "1^Locked^SC-QAM^2^5120^35.6^44.3^|+|\
        2^Locked^SC-QAM^1^5120^29.2^44.0^|+|\
        5^Not Locked^Unknown^0^0^0.0^0.0^";

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid")
            .with_timezone(&Utc)
    }

    #[test]
    fn downstream_table() {
        let parsed = parse_downstream(DOWNSTREAM, now());
        let records = parsed.records();
        assert_eq!(records.len(), 3);
        assert!(parsed.skipped().is_empty());

        let first = &records[0];
        assert_eq!(first.channel, 1);
        assert_eq!(first.channel_id, 20);
        assert_eq!(first.modulation, "QAM256");
        assert_eq!(first.frequency_hz, 573_000_000);
        assert_eq!(first.power_dbmv, 3.1);
        assert_eq!(first.snr_db, Some(40.9));
        assert_eq!(first.corrected, Some(5));
        assert_eq!(first.uncorrected, Some(0));
        assert!(first.is_locked());
        assert_eq!(records[2].power_dbmv, -1.2);
    }

    #[test]
    fn downstream_without_codeword_counters() {
        let parsed = parse_downstream("4^Locked^QAM256^7^501.0^1.0^38.5^", now());
        let reading = &parsed.records()[0];
        assert_eq!(reading.corrected, None);
        assert_eq!(reading.uncorrected, None);
    }

    #[test]
    fn upstream_table() {
        let parsed = parse_upstream(UPSTREAM, now());
        let records = parsed.records();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.direction, Direction::Upstream);
        assert_eq!(first.modulation, "SC-QAM");
        assert_eq!(first.symbol_rate_ksps, Some(5120.0));
        assert_eq!(first.frequency_hz, 35_600_000);
        assert_eq!(first.power_dbmv, 44.3);
        assert_eq!(first.snr_db, None);
        assert!(!records[2].is_locked());
    }

    #[test]
    fn malformed_rows_are_counted() {
        let payload = "1^Locked^QAM256^20^573.0^3.1^40.9^|+|\
            2^Locked^QAM256|+|\
            3^Locked^QAM256^x^573.0^3.1^40.9^";
        let parsed = parse_downstream(payload, now());
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.skipped().len(), 2);
        assert_eq!(
            parsed.skipped()[0].error,
            ParseError::FieldCount {
                expected: 7,
                found: 3
            }
        );
        assert_eq!(
            parsed.skipped()[1].error,
            ParseError::InvalidField {
                field: "channel id",
                value: "x".into()
            }
        );
    }

    #[test]
    fn readings_carry_collection_time() {
        let parsed = parse_upstream(UPSTREAM, now());
        assert!(parsed.records().iter().all(|r| r.collected_at == now()));
    }
}
