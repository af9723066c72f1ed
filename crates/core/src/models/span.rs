use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Look-back window used to bound time-series queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeSpan {
    /// Everything since the Unix epoch
    #[default]
    #[serde(rename = "ALL")]
    All,
    /// Last 24 hours
    #[serde(rename = "1D")]
    OneDay,
    /// Last 7 days
    #[serde(rename = "1W")]
    OneWeek,
    /// Last 30 days
    #[serde(rename = "1M")]
    OneMonth,
    /// Last 90 days
    #[serde(rename = "3M")]
    ThreeMonths,
    /// Last 365 days
    #[serde(rename = "1Y")]
    OneYear,
}

impl TimeSpan {
    pub const ALL_SPANS: [TimeSpan; 6] = [
        TimeSpan::All,
        TimeSpan::OneDay,
        TimeSpan::OneWeek,
        TimeSpan::OneMonth,
        TimeSpan::ThreeMonths,
        TimeSpan::OneYear,
    ];

    /// Fixed look-back duration, `None` for `All`.
    #[must_use]
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            TimeSpan::All => None,
            TimeSpan::OneDay => Some(Duration::hours(24)),
            TimeSpan::OneWeek => Some(Duration::days(7)),
            TimeSpan::OneMonth => Some(Duration::days(30)),
            TimeSpan::ThreeMonths => Some(Duration::days(90)),
            TimeSpan::OneYear => Some(Duration::days(365)),
        }
    }

    /// Inclusive lower bound of the window ending at `now`.
    #[must_use]
    pub fn start_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.lookback() {
            Some(duration) => now
                .checked_sub_signed(duration)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            None => DateTime::UNIX_EPOCH,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TimeSpan::All => "ALL",
            TimeSpan::OneDay => "1D",
            TimeSpan::OneWeek => "1W",
            TimeSpan::OneMonth => "1M",
            TimeSpan::ThreeMonths => "3M",
            TimeSpan::OneYear => "1Y",
        }
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for TimeSpan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        TimeSpan::ALL_SPANS
            .into_iter()
            .find(|span| span.label() == upper)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown time span '{s}': expected one of ALL, 1D, 1W, 1M, 3M, 1Y"
                ))
            })
    }
}
