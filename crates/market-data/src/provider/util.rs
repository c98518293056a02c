use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use tracing::warn;

use crate::errors::MarketDataError;

/// Build an HTTP client with a default request timeout.
///
/// Adapters also set a timeout on every request, so the bound holds even
/// when the builder fails and the plain client is used.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client ({}), using defaults", e);
            Client::new()
        })
}

/// Send a request and return the body of a successful response.
///
/// Maps 429/403 to `RateLimited`, timeouts to `Timeout` and any other
/// non-success status to `ProviderError`.
pub(crate) async fn send_for_text(
    provider: &str,
    request: RequestBuilder,
) -> Result<String, MarketDataError> {
    let response = request
        .send()
        .await
        .map_err(|e| MarketDataError::from_request(provider, e))?;

    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
        return Err(MarketDataError::RateLimited {
            provider: provider.to_string(),
        });
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: "Invalid or missing API key".to_string(),
        });
    }

    if !status.is_success() {
        return Err(MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: format!("HTTP {}", status),
        });
    }

    response
        .text()
        .await
        .map_err(|e| MarketDataError::from_request(provider, e))
}

/// Convert a wire float into a decimal, dropping NaN/inf.
pub(crate) fn decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}

/// Parse a numeric string, tolerating thousands separators, a leading `+`,
/// a trailing `%` and the unicode minus sign.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .replace('\u{2212}', "-")
        .chars()
        .filter(|c| *c != ',' && *c != '%' && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    Decimal::from_str(cleaned).ok()
}
