//! History periods and the window/resolution each one maps to.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Coarse period token accepted by history fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Display for HistoryPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HistoryPeriod::OneDay => "1d",
                HistoryPeriod::OneWeek => "1wk",
                HistoryPeriod::OneMonth => "1mo",
                HistoryPeriod::OneYear => "1y",
                HistoryPeriod::FiveYears => "5y",
            }
        )
    }
}

impl FromStr for HistoryPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1d" => Ok(HistoryPeriod::OneDay),
            "1wk" => Ok(HistoryPeriod::OneWeek),
            "1mo" => Ok(HistoryPeriod::OneMonth),
            "1y" => Ok(HistoryPeriod::OneYear),
            "5y" => Ok(HistoryPeriod::FiveYears),
            _ => Err(format!("Invalid history period: {}", s)),
        }
    }
}

impl HistoryPeriod {
    /// Length of the window ending now.
    pub fn to_duration(&self) -> Duration {
        match self {
            HistoryPeriod::OneDay => Duration::days(1),
            HistoryPeriod::OneWeek => Duration::days(7),
            HistoryPeriod::OneMonth => Duration::days(30),
            HistoryPeriod::OneYear => Duration::days(365),
            HistoryPeriod::FiveYears => Duration::days(365 * 5),
        }
    }

    /// Bar size. Long windows use coarser bars to stay under provider payload limits.
    pub fn resolution(&self) -> Resolution {
        match self {
            HistoryPeriod::OneDay => Resolution::FifteenMinutes,
            HistoryPeriod::OneWeek => Resolution::SixtyMinutes,
            HistoryPeriod::OneMonth | HistoryPeriod::OneYear => Resolution::Daily,
            HistoryPeriod::FiveYears => Resolution::Weekly,
        }
    }
}

/// Bar size of a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    FifteenMinutes,
    SixtyMinutes,
    Daily,
    Weekly,
}

impl Resolution {
    pub fn is_intraday(&self) -> bool {
        matches!(self, Resolution::FifteenMinutes | Resolution::SixtyMinutes)
    }

    /// Display time for a bar: date and time for intraday bars, date only otherwise.
    pub fn format_time(&self, time: DateTime<Utc>) -> String {
        if self.is_intraday() {
            time.format("%Y-%m-%d %H:%M").to_string()
        } else {
            time.format("%Y-%m-%d").to_string()
        }
    }
}

/// Time range and bar size for one history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub period: HistoryPeriod,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resolution: Resolution,
}

impl HistoryWindow {
    pub fn ending_at(period: HistoryPeriod, end: DateTime<Utc>) -> Self {
        Self {
            period,
            start: end - period.to_duration(),
            end,
            resolution: period.resolution(),
        }
    }

    pub fn ending_now(period: HistoryPeriod) -> Self {
        Self::ending_at(period, Utc::now())
    }
}
