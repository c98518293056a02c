//! Wolfee Market Data Crate
//!
//! This crate fetches stock quotes and historical candles from several
//! third-party sources and normalizes them into one record shape.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Turkish exchange (BIST) equities, global equities and commodities
//! - Multiple providers: Google Finance (scrape), Finnhub, Alpha Vantage, Polygon
//! - Per-provider fixed-interval rate limiting
//! - Priority-ordered fallback with per-provider decline diagnostics
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  Consumer        |  (HTTP surface, snapshot cache)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | FetchOrchestrator| --> |   RateLimiter    |  (one slot per provider)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (GoogleFinance, Finnhub, AlphaVantage, Polygon)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  Quote / Candle  |  (normalized market data)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Point-in-time price snapshot for a symbol
//! - [`Candle`] / [`History`] - OHLC bars for a requested period
//! - [`HistoryPeriod`] - Coarse period token (`1d`, `1wk`, `1mo`, `1y`, `5y`)
//! - [`ProviderKind`] - Enumerated provider identity
//! - [`SymbolClass`] - BIST / commodity / global classification

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    change_pct, Candle, History, HistoryPeriod, HistoryWindow, ProviderId, ProviderKind, Quote,
    Resolution, SymbolClass, BIST_SUFFIX, COMMODITY_MARKER,
};

// Re-export provider types
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::google_finance::GoogleFinanceProvider;
pub use provider::polygon::PolygonProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

// Re-export registry types
pub use registry::{
    FetchDiagnostics, FetchOrchestrator, ProviderAttempt, ProviderOrder, ProviderStats,
    RateLimiter, SkipReason,
};
