//! Unit normalization for channel table values.
//!
//! Firmware builds disagree on whether values carry units. Everything is
//! normalized here: frequencies to Hz, power to dBmV, SNR to dB.

use crate::error::ParseError;

/// Bare frequencies below this are taken to be MHz.
const BARE_MHZ_CEILING: f64 = 10_000.0;

/// dBmV = dBµV - 60.
const DBUV_TO_DBMV: f64 = 60.0;

/// Split `"573.0 MHz"` into `("573.0", "mhz")`.
fn split_unit(raw: &str) -> (&str, String) {
    let raw = raw.trim();
    let end = raw
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(end);
    (number.trim(), unit.trim().to_lowercase())
}

fn number(field: &'static str, raw: &str, digits: &str) -> Result<f64, ParseError> {
    digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| invalid(field, raw))
}

fn invalid(field: &'static str, raw: &str) -> ParseError {
    ParseError::InvalidField {
        field,
        value: raw.trim().to_owned(),
    }
}

/// Frequency in Hz. An explicit unit wins; a bare value below 10 000 is
/// MHz, anything larger is already Hz.
pub fn frequency_hz(raw: &str) -> Result<u64, ParseError> {
    let (digits, unit) = split_unit(raw);
    let value = number("frequency", raw, digits)?;
    let hz = match unit.as_str() {
        "hz" => value,
        "khz" => value * 1e3,
        "mhz" => value * 1e6,
        "ghz" => value * 1e9,
        "" if value < BARE_MHZ_CEILING => value * 1e6,
        "" => value,
        _ => return Err(invalid("frequency", raw)),
    };
    if !(0.0..=1e12).contains(&hz) {
        return Err(invalid("frequency", raw));
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    let hz = hz.round() as u64;
    Ok(hz)
}

/// Power level in dBmV.
pub fn power_dbmv(raw: &str) -> Result<f64, ParseError> {
    let (digits, unit) = split_unit(raw);
    let value = number("power", raw, digits)?;
    match unit.as_str() {
        "" | "dbmv" => Ok(value),
        "dbuv" | "dbµv" | "dbμv" => Ok(value - DBUV_TO_DBMV),
        _ => Err(invalid("power", raw)),
    }
}

/// Signal-to-noise ratio in dB.
pub fn snr_db(raw: &str) -> Result<f64, ParseError> {
    let (digits, unit) = split_unit(raw);
    let value = number("snr", raw, digits)?;
    match unit.as_str() {
        "" | "db" => Ok(value),
        _ => Err(invalid("snr", raw)),
    }
}

/// Symbol rate in kilosymbols per second.
pub fn symbol_rate_ksps(raw: &str) -> Result<f64, ParseError> {
    let (digits, unit) = split_unit(raw);
    let value = number("symbol rate", raw, digits)?;
    match unit.as_str() {
        "" | "ksym/s" | "ksps" => Ok(value),
        "msym/s" | "msps" => Ok(value * 1e3),
        "sym/s" => Ok(value / 1e3),
        _ => Err(invalid("symbol rate", raw)),
    }
}

/// Unsigned counter such as a codeword total.
pub fn counter(field: &'static str, raw: &str) -> Result<u64, ParseError> {
    raw.trim().parse().map_err(|_| invalid(field, raw))
}

/// Small unsigned identifier such as a channel number.
pub fn identifier(field: &'static str, raw: &str) -> Result<u32, ParseError> {
    raw.trim().parse().map_err(|_| invalid(field, raw))
}
