use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// The enumerated set of data sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    /// HTML scrape of the Google Finance quote page (BIST only, no credential).
    GoogleFinance,
    /// Finnhub JSON API (quotes and candles).
    Finnhub,
    /// Alpha Vantage JSON API (GLOBAL_QUOTE).
    AlphaVantage,
    /// Polygon.io JSON API (previous-day aggregates and ranges).
    Polygon,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::GoogleFinance,
        ProviderKind::Finnhub,
        ProviderKind::AlphaVantage,
        ProviderKind::Polygon,
    ];

    /// Stable identifier used for logging, rate limiting and stats.
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::GoogleFinance => "GOOGLE_FINANCE",
            ProviderKind::Finnhub => "FINNHUB",
            ProviderKind::AlphaVantage => "ALPHA_VANTAGE",
            ProviderKind::Polygon => "POLYGON",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "google_finance" | "google" | "scrape" => Ok(ProviderKind::GoogleFinance),
            "finnhub" => Ok(ProviderKind::Finnhub),
            "alpha_vantage" | "alphavantage" => Ok(ProviderKind::AlphaVantage),
            "polygon" => Ok(ProviderKind::Polygon),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_ids() {
        assert_eq!(ProviderKind::GoogleFinance.id(), "GOOGLE_FINANCE");
        assert_eq!(ProviderKind::Finnhub.to_string(), "FINNHUB");
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("finnhub".parse(), Ok(ProviderKind::Finnhub));
        assert_eq!("ALPHA_VANTAGE".parse(), Ok(ProviderKind::AlphaVantage));
        assert_eq!(" alpha-vantage ".parse(), Ok(ProviderKind::AlphaVantage));
        assert_eq!("google".parse(), Ok(ProviderKind::GoogleFinance));
        assert!("yahoo".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serializes_as_id() {
        let json = serde_json::to_string(&ProviderKind::AlphaVantage).unwrap();
        assert_eq!(json, "\"ALPHA_VANTAGE\"");
    }
}
