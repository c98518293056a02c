use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::ProviderKind;

/// Decimal places kept for price and change percentage.
pub const PRICE_DP: u32 = 2;

/// Market data quote
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol as requested by the caller (e.g. `THYAO.IS`, `AAPL`)
    pub symbol: String,

    /// Current price, rounded to two decimals (required)
    pub price: Decimal,

    /// Percentage change against the provider's reference price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<Decimal>,

    /// High price of the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Low price of the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Opening price of the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Previous session close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_close: Option<Decimal>,

    /// Trading volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    /// Epoch seconds; fetch time when the provider gives none
    pub timestamp: i64,

    /// Provider the quote came from
    pub source: ProviderKind,
}

impl Quote {
    /// Create a quote with only the required fields, stamped with the current time.
    pub fn new(symbol: &str, price: Decimal, source: ProviderKind) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: price.round_dp(PRICE_DP),
            change_pct: None,
            high: None,
            low: None,
            open: None,
            prev_close: None,
            volume: None,
            timestamp: Utc::now().timestamp(),
            source,
        }
    }

    /// Fill absent high/low/open with the price.
    pub fn with_session_defaults(mut self) -> Self {
        let price = self.price;
        self.high.get_or_insert(price);
        self.low.get_or_insert(price);
        self.open.get_or_insert(price);
        self
    }
}

/// Percentage change from `reference` to `current`, rounded to two decimals.
///
/// Returns zero when the reference is absent or zero.
pub fn change_pct(current: Decimal, reference: Option<Decimal>) -> Decimal {
    match reference {
        Some(reference) if !reference.is_zero() => {
            ((current - reference) / reference * Decimal::ONE_HUNDRED).round_dp(PRICE_DP)
        }
        _ => Decimal::ZERO,
    }
}
