use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which way a bonded channel carries traffic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Downstream,
    Upstream,
}

/// One channel's signal quality at collection time.
///
/// Readings are never deduplicated: every cycle appends one per channel,
/// even when the device state has not changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReading {
    pub direction: Direction,
    /// Position in the device's channel table.
    pub channel: u32,
    /// DOCSIS channel ID assigned by the CMTS.
    pub channel_id: u32,
    pub lock_status: String,
    /// Modulation for downstream channels, channel type for upstream.
    pub modulation: String,
    pub frequency_hz: u64,
    pub power_dbmv: f64,
    /// Downstream only.
    pub snr_db: Option<f64>,
    /// Upstream only, kilosymbols per second.
    pub symbol_rate_ksps: Option<f64>,
    pub corrected: Option<u64>,
    pub uncorrected: Option<u64>,
    pub collected_at: DateTime<Utc>,
}

impl SignalReading {
    pub fn is_locked(&self) -> bool {
        self.lock_status.eq_ignore_ascii_case("locked")
    }

    pub fn frequency_mhz(&self) -> f64 {
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let hz = self.frequency_hz as f64;
        hz / 1_000_000.0
    }
}
