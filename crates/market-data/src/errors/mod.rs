//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The typed reason a provider declined a request
//! - [`FailureKind`]: Classification used for logging and provider stats

mod kind;

pub use kind::FailureKind;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Providers never panic or swallow failures: each decline is one of these
/// variants, so the orchestrator can record *why* a provider gave no data.
/// Each variant maps to a [`FailureKind`] via [`kind`](Self::kind).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider requires an API key and none is configured.
    #[error("Missing credential: {provider}")]
    MissingCredential {
        /// The provider without a credential
        provider: String,
    },

    /// The provider has no coverage for this symbol class or exchange.
    #[error("Unsupported symbol for {provider}: {symbol}")]
    UnsupportedSymbol {
        /// The provider that declined the symbol
        provider: String,
        /// The symbol as requested by the caller
        symbol: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The operation name (e.g. "history")
        operation: String,
        /// The provider
        provider: String,
    },

    /// The provider answered but the result set was empty.
    #[error("No data from {provider} for {symbol}")]
    NoData {
        /// The provider that returned nothing
        provider: String,
        /// The symbol that was requested
        symbol: String,
    },

    /// The provider rate limited the request (HTTP 429 or an API notice).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred (HTTP status, API error message).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The response body could not be parsed into the expected shape.
    #[error("Parse error: {provider} - {message}")]
    ParseError {
        /// The provider whose payload was malformed
        provider: String,
        /// What failed to parse
        message: String,
    },
}

impl MarketDataError {
    /// Returns the failure classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use wolfee_market_data::errors::{FailureKind, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited { provider: "FINNHUB".to_string() };
    /// assert_eq!(error.kind(), FailureKind::Transient);
    ///
    /// let error = MarketDataError::MissingCredential { provider: "POLYGON".to_string() };
    /// assert_eq!(error.kind(), FailureKind::Unconfigured);
    /// ```
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingCredential { .. } => FailureKind::Unconfigured,

            Self::UnsupportedSymbol { .. } | Self::NotSupported { .. } => FailureKind::CoverageGap,

            Self::NoData { .. }
            | Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::ProviderError { .. }
            | Self::ParseError { .. } => FailureKind::Transient,
        }
    }

    /// Map a reqwest send error to `Timeout` or `ProviderError`.
    pub(crate) fn from_request(provider: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::ProviderError {
                provider: provider.to_string(),
                message: format!("Request failed: {}", error),
            }
        }
    }
}
