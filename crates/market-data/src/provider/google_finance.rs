//! Google Finance quote page scraper.
//!
//! The only source with real-time Borsa Istanbul prices, which is why it
//! leads the quote priority list. It reads the public quote page for
//! `BIST:{TICKER}` and extracts the price and day change from the markup,
//! so it is the most fragile provider: a layout change shows up as
//! `NoData` and the orchestrator falls through to the APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{bist_ticker, ProviderKind, Quote, SymbolClass, PRICE_DP};
use crate::provider::util::{build_client, parse_decimal, send_for_text};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.google.com";
const PROVIDER_ID: &str = "GOOGLE_FINANCE";

const QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Price element, most specific first.
const PRICE_SELECTORS: [&str; 2] = ["div.YMlKec.fxKbKc", "div.YMlKec"];
/// Day change element, text like `+1.25 (0.40%)`.
const CHANGE_SELECTOR: &str = "div.JwB6zf";

/// Scrapes the Google Finance quote page. Needs no credential.
pub struct GoogleFinanceProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for GoogleFinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleFinanceProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Create a scraper against a different host (tests).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: build_client(QUOTE_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: QUOTE_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Extract a quote from a quote page body.
///
/// A missing or unreadable change element still yields a price-only quote.
fn parse_quote_page(symbol: &str, body: &str) -> Result<Quote, MarketDataError> {
    let document = Html::parse_document(body);

    let price_text = PRICE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>())
        })
        .ok_or_else(|| MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

    let price = parse_price(&price_text).ok_or_else(|| MarketDataError::ParseError {
        provider: PROVIDER_ID.to_string(),
        message: format!("Unreadable price '{}'", price_text.trim()),
    })?;

    let mut quote = Quote::new(symbol, price, ProviderKind::GoogleFinance);

    let change_text = Selector::parse(CHANGE_SELECTOR).ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    });

    match change_text.as_deref().and_then(parse_change) {
        Some((change, pct)) => {
            quote.change_pct = Some(pct.round_dp(PRICE_DP));
            quote.prev_close = Some((price - change).round_dp(PRICE_DP));
        }
        None => debug!("Google Finance: no change figure for {}, price only", symbol),
    }

    Ok(quote)
}

/// Price text carries a currency symbol and thousands separators (`₺1,234.50`).
fn parse_price(raw: &str) -> Option<Decimal> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    parse_decimal(&digits)
}

/// Split `+1.25 (0.40%)` into the absolute and percentage change.
fn parse_change(raw: &str) -> Option<(Decimal, Decimal)> {
    let mut parts = raw.trim().split('(');
    let change = parts.next()?;
    let pct = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let change = parse_decimal(change)?;
    let pct = parse_decimal(pct.trim_end_matches(')'))?.abs();
    // The percentage is shown unsigned; it follows the sign of the change
    let pct = if change.is_sign_negative() { -pct } else { pct };
    Some((change, pct))
}

#[async_trait]
impl MarketDataProvider for GoogleFinanceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleFinance
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            symbol_classes: &[SymbolClass::Bist],
            supports_latest: true,
            supports_history: false,
        }
    }

    fn provider_symbol(&self, symbol: &str) -> Result<String, MarketDataError> {
        bist_ticker(symbol)
            .map(|ticker| format!("BIST:{}", ticker))
            .ok_or_else(|| MarketDataError::UnsupportedSymbol {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            })
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let page_symbol = self.check_eligible(symbol)?;
        let url = format!("{}/finance/quote/{}", self.base_url, page_symbol);

        debug!("Scraping Google Finance page for {}", page_symbol);

        let request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout);
        let body = send_for_text(PROVIDER_ID, request).await?;

        parse_quote_page(symbol, &body)
    }
}
