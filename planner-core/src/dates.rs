//! Calendar keys and wall-clock parsing.
//!
//! Every date in the engine is a local calendar date, never a UTC one.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SyncError;

/// A `YYYY-MM-DD` local calendar date used to partition to-do lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn from_local(now: &DateTime<Local>) -> Self {
        Self(now.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Renders `time` as a local date-time on this date: `<key>T<HH:MM>:00`.
    pub fn anchor(&self, time: NaiveTime) -> String {
        format!("{}T{:02}:{:02}:00", self, time.hour(), time.minute())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // chrono accepts single-digit months and days; keys must be zero padded
        if s.len() != 10 {
            return Err(SyncError::InvalidInput(format!(
                "date key must be YYYY-MM-DD, got {s:?}"
            )));
        }
        Ok(Self(NaiveDate::parse_from_str(s, Self::FORMAT)?))
    }
}

impl TryFrom<String> for DateKey {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a wall-clock time from either a bare `H:MM`, `HH:MM` or `HH:MM:SS`
/// string or a date-time string. Offsets are converted to local time; a
/// date-time without an offset is already local.
pub fn parse_wall_clock(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(time) = parse_bare_time(input) {
        return Some(time);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local).time());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|dt| dt.time())
}

fn parse_bare_time(input: &str) -> Option<NaiveTime> {
    let mut parts = input.split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;
    let seconds = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let is_digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
    };
    if !is_digits(hours, 1, 2) || !is_digits(minutes, 2, 2) {
        return None;
    }
    if let Some(seconds) = seconds {
        if !is_digits(seconds, 2, 2) || seconds.parse::<u32>().ok()? > 59 {
            return None;
        }
    }

    // seconds are accepted but not kept; slots have minute resolution
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}
