//! Finnhub market data provider implementation.
//!
//! This module provides market data from Finnhub API:
//! - Latest quotes via the /quote endpoint
//! - Candle history via the /stock/candle endpoint
//!
//! Finnhub free tier is limited to 60 API calls per minute, the most
//! headroom of the credentialed providers.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{
    bist_ticker, change_pct, Candle, HistoryWindow, ProviderKind, Quote, Resolution, SymbolClass,
};
use crate::provider::util::{build_client, decimal, send_for_text};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

/// Finnhub lists Borsa Istanbul under its own suffix.
const BIST_SUFFIX: &str = ".IST";

const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);
const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close price
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
    // Note: d (change) and dp (percent change) exist; change is derived from pc instead
}

/// Response from /stock/candle endpoint
#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    /// Close prices
    #[serde(default)]
    c: Vec<f64>,
    /// High prices
    #[serde(default)]
    h: Vec<f64>,
    /// Low prices
    #[serde(default)]
    l: Vec<f64>,
    /// Open prices
    #[serde(default)]
    o: Vec<f64>,
    /// Timestamps (Unix)
    #[serde(default)]
    t: Vec<i64>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
///
/// Supports every symbol class; BIST tickers are rewritten to the `.IST` suffix.
/// Disabled when no API key is configured.
pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    quote_timeout: Duration,
    history_timeout: Duration,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider. An absent or empty key disables it.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a provider against a different endpoint (mirrors, tests).
    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client: build_client(HISTORY_TIMEOUT),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            quote_timeout: QUOTE_TIMEOUT,
            history_timeout: HISTORY_TIMEOUT,
        }
    }

    /// Override the per-request timeouts.
    pub fn with_timeouts(mut self, quote: Duration, history: Duration) -> Self {
        self.quote_timeout = quote;
        self.history_timeout = history;
        self
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::MissingCredential {
                provider: PROVIDER_ID.to_string(),
            })?;

        let url = format!("{}{}", self.base_url, endpoint);

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let request = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", api_key)
            .query(params)
            .timeout(timeout);

        send_for_text(PROVIDER_ID, request).await
    }

    /// Fetch latest quote from /quote endpoint.
    async fn fetch_latest_quote(
        &self,
        symbol: &str,
        provider_symbol: &str,
    ) -> Result<Quote, MarketDataError> {
        let params = [("symbol", provider_symbol)];
        let text = self.fetch("/quote", &params, self.quote_timeout).await?;

        let response: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        // Finnhub returns zeros for unknown symbols instead of an error
        let current = response
            .c
            .filter(|c| *c != 0.0)
            .and_then(decimal)
            .ok_or_else(|| MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            })?;

        let prev_close = response.pc.and_then(decimal).unwrap_or(current);

        let mut quote = Quote::new(symbol, current, ProviderKind::Finnhub);
        quote.change_pct = Some(change_pct(current, Some(prev_close)));
        quote.high = response.h.and_then(decimal);
        quote.low = response.l.and_then(decimal);
        quote.open = response.o.and_then(decimal);
        quote.prev_close = Some(prev_close);
        if let Some(ts) = response.t.filter(|t| *t > 0) {
            quote.timestamp = ts;
        }

        Ok(quote.with_session_defaults())
    }

    /// Fetch candles from /stock/candle endpoint.
    async fn fetch_candles(
        &self,
        symbol: &str,
        provider_symbol: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let from_ts = window.start.timestamp().to_string();
        let to_ts = window.end.timestamp().to_string();

        let params = [
            ("symbol", provider_symbol),
            ("resolution", resolution_code(window.resolution)),
            ("from", from_ts.as_str()),
            ("to", to_ts.as_str()),
        ];

        let text = self
            .fetch("/stock/candle", &params, self.history_timeout)
            .await?;

        let response: CandleResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse candle response: {}", e),
            })?;

        if response.s != "ok" {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        // Validate array lengths match
        let len = response.t.len();
        if response.c.len() != len
            || response.o.len() != len
            || response.h.len() != len
            || response.l.len() != len
        {
            return Err(MarketDataError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: "Mismatched array lengths in candle response".to_string(),
            });
        }

        let mut bars: Vec<usize> = (0..len).collect();
        bars.sort_by_key(|&i| response.t[i]);

        let mut candles = Vec::with_capacity(len);
        for i in bars {
            let bar = (
                decimal(response.o[i]),
                decimal(response.h[i]),
                decimal(response.l[i]),
                decimal(response.c[i]),
            );
            let candle = match bar {
                (Some(o), Some(h), Some(l), Some(c)) => {
                    Candle::from_bar(response.t[i], window.resolution, o, h, l, c)
                }
                _ => None,
            };
            match candle {
                Some(candle) => candles.push(candle),
                None => warn!("Skipping invalid Finnhub bar at index {} for {}", i, symbol),
            }
        }

        if candles.is_empty() {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        debug!(
            "Finnhub: fetched {} candles for {} ({} to {})",
            candles.len(),
            symbol,
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d")
        );

        Ok(candles)
    }
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Finnhub
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            symbol_classes: &[SymbolClass::Bist, SymbolClass::Commodity, SymbolClass::Global],
            supports_latest: true,
            supports_history: true,
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider_symbol(&self, symbol: &str) -> Result<String, MarketDataError> {
        Ok(match bist_ticker(symbol) {
            Some(ticker) => format!("{}{}", ticker, BIST_SUFFIX),
            None => symbol.to_string(),
        })
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let provider_symbol = self.check_eligible(symbol)?;

        debug!("Fetching latest quote for {} from Finnhub", provider_symbol);

        self.fetch_latest_quote(symbol, &provider_symbol).await
    }

    async fn get_history(
        &self,
        symbol: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let provider_symbol = self.check_eligible(symbol)?;

        debug!(
            "Fetching {} history for {} from Finnhub",
            window.period, provider_symbol
        );

        self.fetch_candles(symbol, &provider_symbol, window).await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Map a resolution to Finnhub's code (supported: 1, 5, 15, 30, 60, D, W, M).
fn resolution_code(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::FifteenMinutes => "15",
        Resolution::SixtyMinutes => "60",
        Resolution::Daily => "D",
        Resolution::Weekly => "W",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryPeriod;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_endpoint(endpoint: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v1{}", endpoint)))
            .and(header("X-Finnhub-Token", "test_key"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider_for(server: &MockServer) -> FinnhubProvider {
        FinnhubProvider::with_base_url(
            Some("test_key".to_string()),
            &format!("{}/api/v1", server.uri()),
        )
    }

    #[test]
    fn test_provider_id() {
        let provider = FinnhubProvider::new(Some("test_key".to_string()));
        assert_eq!(provider.id(), "FINNHUB");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_empty_key_disables_provider() {
        assert!(!FinnhubProvider::new(None).is_configured());
        assert!(!FinnhubProvider::new(Some("  ".to_string())).is_configured());
    }

    #[test]
    fn test_bist_suffix_rewritten() {
        let provider = FinnhubProvider::new(Some("test_key".to_string()));
        assert_eq!(provider.provider_symbol("THYAO.IS").unwrap(), "THYAO.IST");
        assert_eq!(provider.provider_symbol("AAPL").unwrap(), "AAPL");
    }

    #[test]
    fn test_resolution_codes() {
        assert_eq!(resolution_code(Resolution::FifteenMinutes), "15");
        assert_eq!(resolution_code(Resolution::SixtyMinutes), "60");
        assert_eq!(resolution_code(Resolution::Daily), "D");
        assert_eq!(resolution_code(Resolution::Weekly), "W");
    }

    #[tokio::test]
    async fn test_missing_key_declines_without_request() {
        let mock_server = MockServer::start().await;
        let provider = FinnhubProvider::with_base_url(None, &mock_server.uri());

        let result = provider.get_quote("AAPL").await;
        assert!(matches!(
            result,
            Err(MarketDataError::MissingCredential { .. })
        ));
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_quote() {
        let body = r#"{
            "c": 110.0,
            "d": 10.0,
            "dp": 10.0,
            "h": 112.5,
            "l": 99.5,
            "o": 100.5,
            "pc": 100.0,
            "t": 1704067200
        }"#;
        let mock_server = mock_endpoint("/quote", 200, body).await;
        let provider = provider_for(&mock_server);

        let quote = provider.get_quote("AAPL").await.unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(110));
        assert_eq!(quote.change_pct, Some(dec!(10)));
        assert_eq!(quote.high, Some(dec!(112.5)));
        assert_eq!(quote.low, Some(dec!(99.5)));
        assert_eq!(quote.open, Some(dec!(100.5)));
        assert_eq!(quote.prev_close, Some(dec!(100)));
        assert_eq!(quote.timestamp, 1704067200);
        assert_eq!(quote.source, ProviderKind::Finnhub);
    }

    #[tokio::test]
    async fn test_quote_sends_ist_symbol() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "GARAN.IST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"c": 95.5, "pc": 0}"#))
            .mount(&mock_server)
            .await;
        let provider = FinnhubProvider::with_base_url(Some("test_key".to_string()), &mock_server.uri());

        let quote = provider.get_quote("GARAN.IS").await.unwrap();
        assert_eq!(quote.symbol, "GARAN.IS");
        assert_eq!(quote.price, dec!(95.5));
        // Zero reference price yields zero change
        assert_eq!(quote.change_pct, Some(dec!(0)));
        assert_eq!(quote.high, Some(dec!(95.5)));
    }

    #[tokio::test]
    async fn test_zero_price_is_no_data() {
        let body = r#"{"c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0}"#;
        let mock_server = mock_endpoint("/quote", 200, body).await;
        let provider = provider_for(&mock_server);

        let result = provider.get_quote("XYZQ").await;
        assert!(matches!(result, Err(MarketDataError::NoData { .. })));
    }

    #[tokio::test]
    async fn test_rate_limited_quote() {
        let mock_server = mock_endpoint("/quote", 429, "").await;
        let provider = provider_for(&mock_server);

        let result = provider.get_quote("AAPL").await;
        assert!(matches!(result, Err(MarketDataError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_malformed_quote() {
        let mock_server = mock_endpoint("/quote", 200, "<html>oops</html>").await;
        let provider = provider_for(&mock_server);

        let result = provider.get_quote("AAPL").await;
        assert!(matches!(result, Err(MarketDataError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_daily_candles() {
        let body = r#"{
            "s": "ok",
            "c": [151.0, 150.0],
            "h": [152.0, 151.0],
            "l": [150.0, 149.0],
            "o": [150.5, 149.5],
            "v": [1100000, 1000000],
            "t": [1704153600, 1704067200]
        }"#;
        let mock_server = mock_endpoint("/stock/candle", 200, body).await;
        let provider = provider_for(&mock_server);
        let window = HistoryWindow::ending_now(HistoryPeriod::OneYear);

        let candles = provider.get_history("AAPL", &window).await.unwrap();
        assert_eq!(candles.len(), 2);
        // Sorted chronologically, date-only
        assert_eq!(candles[0].time, "2024-01-01");
        assert_eq!(candles[0].close, dec!(150));
        assert_eq!(candles[1].time, "2024-01-02");
    }

    #[tokio::test]
    async fn test_intraday_candles_include_time() {
        let body = r#"{
            "s": "ok",
            "c": [150.0],
            "h": [151.0],
            "l": [149.0],
            "o": [149.5],
            "t": [1704097800]
        }"#;
        let mock_server = mock_endpoint("/stock/candle", 200, body).await;
        let provider = provider_for(&mock_server);
        let window = HistoryWindow::ending_now(HistoryPeriod::OneDay);

        let candles = provider.get_history("AAPL", &window).await.unwrap();
        assert_eq!(candles[0].time, "2024-01-01 08:30");
    }

    #[tokio::test]
    async fn test_candles_no_data() {
        let mock_server = mock_endpoint("/stock/candle", 200, r#"{"s": "no_data"}"#).await;
        let provider = provider_for(&mock_server);
        let window = HistoryWindow::ending_now(HistoryPeriod::OneMonth);

        let result = provider.get_history("AAPL", &window).await;
        assert!(matches!(result, Err(MarketDataError::NoData { .. })));
    }

    #[test]
    fn test_candle_response_parsing() {
        let json = r#"{"s": "no_data"}"#;

        let response: CandleResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.s, "no_data");
        assert!(response.c.is_empty());
    }

    #[tokio::test]
    async fn test_slow_quote_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/quote"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"c": 1.0}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;
        let provider = provider_for(&mock_server)
            .with_timeouts(Duration::from_millis(100), Duration::from_millis(100));

        let result = provider.get_quote("AAPL").await;
        assert!(matches!(result, Err(MarketDataError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_slow_candles_time_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/stock/candle"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"s": "no_data"}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;
        let provider = provider_for(&mock_server)
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(100));
        let window = HistoryWindow::ending_now(HistoryPeriod::OneYear);

        let result = provider.get_history("AAPL", &window).await;
        assert!(matches!(result, Err(MarketDataError::Timeout { .. })));
    }
}
