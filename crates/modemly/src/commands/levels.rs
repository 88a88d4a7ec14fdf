//! Channel level command handler.

use tabled::Tabled;
use tracing::warn;

use modemly_config::Config;
use modemly_core::parse::{parse_downstream, parse_upstream};
use modemly_core::{Direction, Fetcher, Resource, SignalReading};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Dir")]
    direction: String,
    #[tabled(rename = "Ch")]
    channel: u32,
    #[tabled(rename = "ID")]
    channel_id: u32,
    #[tabled(rename = "Lock")]
    lock_status: String,
    #[tabled(rename = "Modulation")]
    modulation: String,
    #[tabled(rename = "Freq (MHz)")]
    frequency: String,
    #[tabled(rename = "Power (dBmV)")]
    power: String,
    #[tabled(rename = "SNR (dB)")]
    snr: String,
    #[tabled(rename = "Symbol Rate (ksym/s)")]
    symbol_rate: String,
    #[tabled(rename = "Corrected")]
    corrected: String,
    #[tabled(rename = "Uncorrected")]
    uncorrected: String,
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl From<&SignalReading> for SignalRow {
    fn from(r: &SignalReading) -> Self {
        Self {
            direction: r.direction.to_string(),
            channel: r.channel,
            channel_id: r.channel_id,
            lock_status: r.lock_status.clone(),
            modulation: r.modulation.clone(),
            frequency: format!("{:.1}", r.frequency_mhz()),
            power: format!("{:.1}", r.power_dbmv),
            snr: opt(r.snr_db.map(|v| format!("{v:.1}"))),
            symbol_rate: opt(r.symbol_rate_ksps.map(|v| format!("{v:.0}"))),
            corrected: opt(r.corrected),
            uncorrected: opt(r.uncorrected),
        }
    }
}

fn plain_line(r: &SignalReading) -> String {
    format!(
        "{} {} {:.1}MHz {:.1}dBmV {}",
        r.direction,
        r.channel,
        r.frequency_mhz(),
        r.power_dbmv,
        r.lock_status
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, fetcher) = super::connect(config)?;
    let readings = fetch_levels(&fetcher).await?;
    let out = output::render_list(&global.output, &readings, |r| SignalRow::from(r), plain_line);
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn fetch_levels(fetcher: &Fetcher) -> Result<Vec<SignalReading>, CliError> {
    let (downstream, upstream) = tokio::join!(
        fetcher.fetch(Resource::Downstream),
        fetcher.fetch(Resource::Upstream),
    );
    let (downstream, upstream) = (downstream?, upstream?);

    let mut readings = Vec::new();
    for (direction, parsed) in [
        (
            Direction::Downstream,
            parse_downstream(&downstream.body, downstream.collected_at),
        ),
        (
            Direction::Upstream,
            parse_upstream(&upstream.body, upstream.collected_at),
        ),
    ] {
        for skipped in parsed.skipped() {
            warn!(%direction, row = skipped.index, error = %skipped.error, "unparseable channel row");
        }
        if parsed.is_unavailable() {
            warn!(%direction, "modem reported no channels");
        }
        readings.extend(parsed.into_records());
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(direction: Direction, symbol_rate_ksps: Option<f64>) -> SignalReading {
        SignalReading {
            direction,
            channel: 1,
            channel_id: 2,
            lock_status: "Locked".into(),
            modulation: "SC-QAM".into(),
            frequency_hz: 35_600_000,
            power_dbmv: 44.3,
            snr_db: None,
            symbol_rate_ksps,
            corrected: None,
            uncorrected: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn upstream_row_shows_symbol_rate() {
        let row = SignalRow::from(&reading(Direction::Upstream, Some(5120.0)));
        assert_eq!(row.symbol_rate, "5120");
        assert_eq!(row.snr, "");
    }

    #[test]
    fn downstream_row_leaves_symbol_rate_blank() {
        let row = SignalRow::from(&reading(Direction::Downstream, None));
        assert_eq!(row.symbol_rate, "");
    }
}
