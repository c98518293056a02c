//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data providers must implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Candle, HistoryWindow, ProviderKind, Quote, SymbolClass};

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source.
/// A provider knows one source's request shape, response shape and
/// symbol quirks, and turns a successful response into a [`Quote`] or
/// a list of [`Candle`]s. Every decline is a typed [`MarketDataError`].
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use wolfee_market_data::provider::{MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider {
///     api_key: Option<String>,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn kind(&self) -> ProviderKind {
///         ProviderKind::Finnhub
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             symbol_classes: &[SymbolClass::Global],
///             supports_latest: true,
///             supports_history: false,
///         }
///     }
///
///     // ... implement provider_symbol and get_quote
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Which of the enumerated sources this is.
    fn kind(&self) -> ProviderKind;

    /// Unique identifier for this provider.
    ///
    /// Used for logging, rate limiting and stats.
    fn id(&self) -> &'static str {
        self.kind().id()
    }

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Interval this provider needs regardless of the limiter's default.
    ///
    /// `None` uses the default interval of the orchestrator's limiter.
    fn rate_limit(&self) -> Option<RateLimit> {
        None
    }

    /// Whether the credential this provider needs is present.
    ///
    /// Providers without credentials report `true`.
    fn is_configured(&self) -> bool {
        true
    }

    /// Translate a canonical symbol into this provider's format.
    ///
    /// Returns `UnsupportedSymbol` when the provider has no coverage for it.
    fn provider_symbol(&self, symbol: &str) -> Result<String, MarketDataError>;

    /// Check credential and coverage without touching the network.
    ///
    /// On success returns the provider-specific symbol.
    fn check_eligible(&self, symbol: &str) -> Result<String, MarketDataError> {
        if !self.is_configured() {
            return Err(MarketDataError::MissingCredential {
                provider: self.id().to_string(),
            });
        }

        if !self.capabilities().covers(SymbolClass::of(symbol)) {
            return Err(MarketDataError::UnsupportedSymbol {
                provider: self.id().to_string(),
                symbol: symbol.to_string(),
            });
        }

        self.provider_symbol(symbol)
    }

    /// Fetch the latest quote for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - The canonical symbol (e.g. `THYAO.IS`, `AAPL`, `GC=F`)
    ///
    /// # Returns
    ///
    /// The normalized quote on success, or the reason the provider declined.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch candle history for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - The canonical symbol
    /// * `window` - Start, end and bar resolution of the request
    ///
    /// # Returns
    ///
    /// Candles ordered by time ascending. Default implementation returns `NotSupported`.
    async fn get_history(
        &self,
        symbol: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let _ = (symbol, window);
        Err(MarketDataError::NotSupported {
            operation: "history".to_string(),
            provider: self.id().to_string(),
        })
    }
}
