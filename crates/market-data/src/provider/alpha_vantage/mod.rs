//! Alpha Vantage market data provider implementation.
//!
//! This module provides latest quotes from the Alpha Vantage GLOBAL_QUOTE
//! endpoint. Alpha Vantage has no Borsa Istanbul coverage, so `.IS` symbols
//! are declined before any request is made.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute, and
//! reports throttling inside a 200 response ("Note" / "Information").

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{change_pct, ProviderKind, Quote, SymbolClass, PRICE_DP};
use crate::provider::util::{build_client, parse_decimal, send_for_text};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Alpha Vantage market data provider.
///
/// Latest quotes only; disabled when no API key is configured.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Unknown symbols come back as an empty object, so every field is optional.
#[derive(Debug, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

fn field(value: &Option<String>) -> Option<Decimal> {
    value.as_deref().and_then(parse_decimal)
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider. An absent or empty key disables it.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a provider against a different endpoint (mirrors, tests).
    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client: build_client(QUOTE_TIMEOUT),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.to_string(),
            timeout: QUOTE_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::MissingCredential {
                provider: PROVIDER_ID.to_string(),
            })?;

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", api_key));

        debug!("Alpha Vantage request: {:?}", params);

        let request = self
            .client
            .get(&self.base_url)
            .query(&all_params)
            .timeout(self.timeout);
        send_for_text(PROVIDER_ID, request).await
    }

    /// Check for API-level errors in the response.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(ref msg) = error_message {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        // "Note" usually indicates rate limiting
        if let Some(ref msg) = note {
            if is_rate_limit_notice(msg) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage note: {}", msg);
        }

        // "Information" can indicate various issues
        if let Some(ref msg) = information {
            if is_rate_limit_notice(msg) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage info: {}", msg);
        }

        Ok(())
    }

    /// Fetch the latest quote using GLOBAL_QUOTE endpoint.
    async fn fetch_global_quote(
        &self,
        symbol: &str,
        provider_symbol: &str,
    ) -> Result<Quote, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", provider_symbol)];
        let text = self.fetch(&params).await?;

        let response: GlobalQuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse GLOBAL_QUOTE response: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let data = response.global_quote.unwrap_or_default();
        let price = field(&data.price).ok_or_else(|| MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

        let prev_close = field(&data.previous_close);

        let mut quote = Quote::new(symbol, price, ProviderKind::AlphaVantage);
        quote.change_pct = Some(
            field(&data.change_percent)
                .map(|pct| pct.round_dp(PRICE_DP))
                .unwrap_or_else(|| change_pct(price, prev_close)),
        );
        quote.high = field(&data.high);
        quote.low = field(&data.low);
        quote.open = field(&data.open);
        quote.prev_close = prev_close;
        quote.volume = data
            .volume
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(quote.with_session_defaults())
    }
}

fn is_rate_limit_notice(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("api call frequency") || msg.contains("rate limit")
}

// ============================================================================
// MarketDataProvider implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AlphaVantage
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            symbol_classes: &[SymbolClass::Commodity, SymbolClass::Global],
            supports_latest: true,
            supports_history: false,
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

        debug!("Fetching latest quote for {} from Alpha Vantage", provider_symbol);

        self.fetch_global_quote(symbol, &provider_symbol).await
    }
}

// ============================================================================
// Tests
// ============================================================================
