//! Run and timestep identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest lead time that still fits the three-digit key suffix.
pub const MAX_TIMESTEP: u32 = 999;

/// Cycle hours at which the model is initialized.
const CYCLE_HOURS: [u8; 4] = [0, 6, 12, 18];

const DATE_FORMAT: &str = "%Y%m%d";

/// Malformed run or timestep input. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("invalid run hour {0:?}: expected one of 0, 6, 12, 18")]
    RunHour(String),

    #[error("invalid run date {0:?}: expected YYYYMMDD")]
    Date(String),

    #[error("invalid timestep {0}: expected 0..={max}", max = MAX_TIMESTEP)]
    Timestep(i64),
}

/// Cycle hour of a model run (00Z, 06Z, 12Z or 18Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RunHour(u8);

impl RunHour {
    pub const H00: RunHour = RunHour(0);
    pub const H06: RunHour = RunHour(6);
    pub const H12: RunHour = RunHour(12);
    pub const H18: RunHour = RunHour(18);

    /// Hour of day in UTC.
    pub fn hour(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RunHour {
    type Error = InvalidArgument;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        CYCLE_HOURS
            .iter()
            .find(|h| i64::from(**h) == value)
            .map(|h| RunHour(*h))
            .ok_or_else(|| InvalidArgument::RunHour(value.to_string()))
    }
}

impl From<RunHour> for u8 {
    fn from(value: RunHour) -> Self {
        value.0
    }
}

impl FromStr for RunHour {
    type Err = InvalidArgument;

    /// Accepts `"0"`, `"00"`, `"12"`, ... Anything non-numeric is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| InvalidArgument::RunHour(s.to_string()))?;
        RunHour::try_from(value)
    }
}

impl fmt::Display for RunHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// One model cycle: a calendar date plus a cycle hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunIdentifier {
    #[serde(with = "yyyymmdd")]
    date: NaiveDate,
    run_hour: RunHour,
}

impl RunIdentifier {
    pub fn new(date: NaiveDate, run_hour: RunHour) -> Self {
        Self { date, run_hour }
    }

    /// Build from raw trigger inputs (`"20201215"`, `0`).
    pub fn parse(date: &str, run_hour: i64) -> Result<Self, InvalidArgument> {
        Ok(Self {
            date: parse_date(date)?,
            run_hour: RunHour::try_from(run_hour)?,
        })
    }

    /// The run of `run_hour` on the UTC date of the trigger time.
    pub fn for_trigger(run_hour: RunHour, triggered_at: DateTime<Utc>) -> Self {
        Self {
            date: triggered_at.date_naive(),
            run_hour,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn run_hour(&self) -> RunHour {
        self.run_hour
    }

    /// Date formatted as `YYYYMMDD`, the form used in object keys.
    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.date_key(), self.run_hour)
    }
}

/// Parse a `YYYYMMDD` date.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, InvalidArgument> {
    let trimmed = s.trim();
    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidArgument::Date(s.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| InvalidArgument::Date(s.to_string()))
}

/// One forecast lead time of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestepRequest {
    pub run: RunIdentifier,
    pub timestep: u32,
}

impl TimestepRequest {
    pub fn new(run: RunIdentifier, timestep: u32) -> Result<Self, InvalidArgument> {
        if timestep > MAX_TIMESTEP {
            return Err(InvalidArgument::Timestep(i64::from(timestep)));
        }
        Ok(Self { run, timestep })
    }
}

impl fmt::Display for TimestepRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/f{:03}", self.run, self.timestep)
    }
}

mod yyyymmdd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(super::DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}
