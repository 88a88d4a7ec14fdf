use std::fmt;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// DOCSIS event priority as printed by the firmware (`Critical (3)`).
///
/// Levels run 1 (emergency) through 8 (debug).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
    /// A label this build does not recognise, kept verbatim.
    Other(String),
}

impl Severity {
    /// Classify a device label. The numeric `(N)` suffix wins over the
    /// name when both are present.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        let numeric = label
            .rsplit_once('(')
            .and_then(|(_, rest)| rest.strip_suffix(')'))
            .and_then(|digits| digits.trim().parse::<u8>().ok());

        if let Some(level) = numeric.and_then(Self::from_level) {
            return level;
        }

        let lower = label.to_ascii_lowercase();
        let named = [
            ("emerg", Self::Emergency),
            ("alert", Self::Alert),
            ("crit", Self::Critical),
            ("err", Self::Error),
            ("warn", Self::Warning),
            ("notice", Self::Notice),
            ("info", Self::Info),
            ("debug", Self::Debug),
        ];
        named
            .into_iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .map_or_else(|| Self::Other(label.to_owned()), |(_, severity)| severity)
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Some(match level {
            1 => Self::Emergency,
            2 => Self::Alert,
            3 => Self::Critical,
            4 => Self::Error,
            5 => Self::Warning,
            6 => Self::Notice,
            7 => Self::Info,
            8 => Self::Debug,
            _ => return None,
        })
    }

    /// Numeric priority, `None` for unrecognised labels.
    pub fn level(&self) -> Option<u8> {
        match self {
            Self::Emergency => Some(1),
            Self::Alert => Some(2),
            Self::Critical => Some(3),
            Self::Error => Some(4),
            Self::Warning => Some(5),
            Self::Notice => Some(6),
            Self::Info => Some(7),
            Self::Debug => Some(8),
            Self::Other(_) => None,
        }
    }

    /// Short name used as a sink tag.
    pub fn name(&self) -> &str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emergency => f.write_str("Emergency (1)"),
            Self::Alert => f.write_str("Alert (2)"),
            Self::Critical => f.write_str("Critical (3)"),
            Self::Error => f.write_str("Error (4)"),
            Self::Warning => f.write_str("Warning (5)"),
            Self::Notice => f.write_str("Notice (6)"),
            Self::Info => f.write_str("Information (7)"),
            Self::Debug => f.write_str("Debug (8)"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

/// One line of the device's rotating event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Position in the fetched log. Not stable across reboots.
    pub sequence: u32,
    /// Device timestamp exactly as printed, whitespace-normalized.
    pub device_time_raw: String,
    /// Parsed device timestamp; absent before the device syncs its clock.
    pub device_time: Option<DateTime<FixedOffset>>,
    pub severity: Severity,
    pub message: String,
    pub collected_at: DateTime<Utc>,
}

impl EventLogEntry {
    pub fn identity(&self) -> EventIdentity {
        EventIdentity {
            device_time: self.device_time_raw.clone(),
            severity: self.severity.clone(),
            message: self.message.clone(),
        }
    }
}

/// Deduplication key for an event: what the device printed, minus the
/// unstable sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventIdentity {
    pub device_time: String,
    pub severity: Severity,
    pub message: String,
}

impl EventIdentity {
    /// Hex SHA-256 of the identity, stable across releases.
    pub fn key(&self) -> String {
        hex::encode(self.digest())
    }

    /// Stand-in timestamp for entries the device printed without a time.
    ///
    /// Derived from the digest alone, so every write of the same entry
    /// lands on the same point. Falls within the first few days after
    /// the Unix epoch, well clear of any real device time.
    pub fn synthetic_time(&self) -> DateTime<Utc> {
        let digest = self.digest();
        let mut head = [0_u8; 8];
        head.copy_from_slice(&digest[..8]);
        // 48 bits of nanoseconds always fit an i64.
        let nanos = i64::try_from(u64::from_be_bytes(head) >> 16).unwrap_or(0);
        Utc.timestamp_nanos(nanos)
    }

    fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.device_time.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.severity.name().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.message.as_bytes());
        let mut out = [0_u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}
