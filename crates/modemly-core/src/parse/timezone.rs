use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Zone the device clock prints its event-log timestamps in.
///
/// The firmware prints wall-clock time with no offset, so the collector
/// has to be told how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceTimezone {
    #[default]
    Utc,
    /// Whatever zone the collector host runs in.
    Local,
    Fixed(FixedOffset),
}

impl DeviceTimezone {
    /// Attach this zone to a naive device timestamp. Returns `None` for
    /// wall-clock times that do not exist in the zone (DST gaps).
    pub fn localize(self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Utc => Some(naive.and_utc().fixed_offset()),
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Self::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        }
    }
}

impl FromStr for DeviceTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::Utc);
        }
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        parse_offset(s)
            .map(Self::Fixed)
            .ok_or_else(|| format!("invalid timezone '{s}' (expected utc, local, or +HH:MM)"))
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl fmt::Display for DeviceTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("utc"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl TryFrom<String> for DeviceTimezone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceTimezone> for String {
    fn from(value: DeviceTimezone) -> Self {
        value.to_string()
    }
}
