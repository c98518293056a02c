//! Polygon.io market data provider implementation.
//!
//! - Latest quotes from the previous-session aggregate (`/v2/aggs/ticker/{sym}/prev`)
//! - Candle history from range aggregates (`/v2/aggs/ticker/{sym}/range/...`)
//!
//! Polygon has no Borsa Istanbul coverage. Its free tier allows 5 calls per
//! minute, so it sits last in the quote priority list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{change_pct, Candle, HistoryWindow, ProviderKind, Quote, Resolution, SymbolClass};
use crate::provider::util::{build_client, decimal, send_for_text};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://api.polygon.io";
const PROVIDER_ID: &str = "POLYGON";

const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);
const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on bars per range request.
const RANGE_LIMIT: &str = "500";

/// Aggregates response, shared by the prev and range endpoints.
#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Vec<AggregateBar>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Close
    c: f64,
    /// Open
    o: Option<f64>,
    /// High
    h: Option<f64>,
    /// Low
    l: Option<f64>,
    /// Volume
    v: Option<f64>,
    /// Bar start, Unix milliseconds
    t: Option<i64>,
}

/// Polygon.io market data provider.
pub struct PolygonProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    quote_timeout: Duration,
    history_timeout: Duration,
}

impl PolygonProvider {
    /// Create a new Polygon provider. An absent or empty key disables it.
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

    async fn fetch_aggregates(
        &self,
        path: &str,
        extra: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<AggregatesResponse, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::MissingCredential {
                provider: PROVIDER_ID.to_string(),
            })?;

        let mut params: Vec<(&str, &str)> = vec![("apiKey", api_key)];
        params.extend_from_slice(extra);

        debug!("Polygon request: {}", path);

        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&params)
            .timeout(timeout);
        let text = send_for_text(PROVIDER_ID, request).await?;

        serde_json::from_str(&text).map_err(|e| MarketDataError::ParseError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse aggregates response: {}", e),
        })
    }

    async fn fetch_previous_session(
        &self,
        symbol: &str,
        provider_symbol: &str,
    ) -> Result<Quote, MarketDataError> {
        let path = format!(
            "/v2/aggs/ticker/{}/prev",
            urlencoding::encode(provider_symbol)
        );
        let response = self.fetch_aggregates(&path, &[], self.quote_timeout).await?;

        let bar = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            })?;

        let close = decimal(bar.c).ok_or_else(|| MarketDataError::ParseError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Invalid close price: {}", bar.c),
        })?;
        let open = bar.o.and_then(decimal).unwrap_or(close);

        // The prev endpoint carries no reference close; change is intraday, open to close.
        let mut quote = Quote::new(symbol, close, ProviderKind::Polygon);
        quote.change_pct = Some(change_pct(close, Some(open)));
        quote.open = Some(open);
        quote.high = bar.h.and_then(decimal);
        quote.low = bar.l.and_then(decimal);
        quote.volume = bar.v.filter(|v| *v >= 0.0).map(|v| v as u64);
        if let Some(ms) = bar.t {
            quote.timestamp = ms / 1000;
        }

        Ok(quote.with_session_defaults())
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        provider_symbol: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let (multiplier, timespan) = range_span(window.resolution);
        let path = format!(
            "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            urlencoding::encode(provider_symbol),
            multiplier,
            timespan,
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d"),
        );
        let response = self
            .fetch_aggregates(&path, &[("limit", RANGE_LIMIT)], self.history_timeout)
            .await?;

        let mut bars = response.results;
        bars.sort_by_key(|bar| bar.t);

        let mut candles = Vec::with_capacity(bars.len());
        for bar in &bars {
            let candle = match (bar.t, decimal(bar.c)) {
                (Some(ms), Some(close)) => Candle::from_bar(
                    ms / 1000,
                    window.resolution,
                    bar.o.and_then(decimal).unwrap_or(close),
                    bar.h.and_then(decimal).unwrap_or(close),
                    bar.l.and_then(decimal).unwrap_or(close),
                    close,
                ),
                _ => None,
            };
            match candle {
                Some(candle) => candles.push(candle),
                None => warn!("Skipping invalid Polygon bar for {}", symbol),
            }
        }

        if candles.is_empty() {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        debug!("Polygon: fetched {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataProvider for PolygonProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Polygon
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            symbol_classes: &[SymbolClass::Commodity, SymbolClass::Global],
            supports_latest: true,
            supports_history: true,
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider_symbol(&self, symbol: &str) -> Result<String, MarketDataError> {
        match SymbolClass::of(symbol) {
            SymbolClass::Bist => Err(MarketDataError::UnsupportedSymbol {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            }),
            _ => Ok(symbol.to_string()),
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let provider_symbol = self.check_eligible(symbol)?;
        self.fetch_previous_session(symbol, &provider_symbol).await
    }

    async fn get_history(
        &self,
        symbol: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let provider_symbol = self.check_eligible(symbol)?;

        debug!(
            "Fetching {} history for {} from Polygon",
            window.period, provider_symbol
        );

        self.fetch_range(symbol, &provider_symbol, window).await
    }
}

/// Multiplier and timespan path segments for a resolution.
fn range_span(resolution: Resolution) -> (u32, &'static str) {
    match resolution {
        Resolution::FifteenMinutes => (15, "minute"),
        Resolution::SixtyMinutes => (60, "minute"),
        Resolution::Daily => (1, "day"),
        Resolution::Weekly => (1, "week"),
    }
}
