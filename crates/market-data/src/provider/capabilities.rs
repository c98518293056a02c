//! Provider capabilities and rate limiting configuration.
//!
//! This module defines structures for describing what a market data provider
//! can do and how it should be rate-limited.

use std::time::Duration;

use crate::models::SymbolClass;

/// Describes the capabilities of a market data provider.
///
/// Used by the orchestrator to skip providers that structurally
/// cannot serve a symbol or operation, without touching the network.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Symbol classes this provider covers (BIST, commodity, global).
    pub symbol_classes: &'static [SymbolClass],

    /// Whether the provider serves latest quotes.
    pub supports_latest: bool,

    /// Whether the provider serves candle history.
    pub supports_history: bool,
}

impl ProviderCapabilities {
    pub fn covers(&self, class: SymbolClass) -> bool {
        self.symbol_classes.contains(&class)
    }
}

/// Per-provider rate limit override.
///
/// A fixed minimum interval between two calls to the same provider;
/// there is no burst allowance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Minimum delay between two requests to this provider.
    pub min_interval: Duration,
}
