use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::period::Resolution;

/// One OHLC bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Display time, formatted per resolution
    pub time: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Candle {
    /// Build a candle from a bar's epoch-seconds timestamp.
    ///
    /// Returns `None` for timestamps chrono cannot represent.
    pub fn from_bar(
        epoch_secs: i64,
        resolution: Resolution,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Option<Self> {
        let time = Utc.timestamp_opt(epoch_secs, 0).single()?;
        Some(Self {
            time: resolution.format_time(time),
            open,
            high,
            low,
            close,
        })
    }
}

/// Chronological candle series for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub symbol: String,
    pub history: Vec<Candle>,
}
