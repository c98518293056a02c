//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and rate limiting configuration
//! - Concrete provider implementations (Google Finance, Finnhub, Alpha Vantage, Polygon)
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: The orchestrator only sees `MarketDataProvider`
//! - **Extensible**: New providers can be added by implementing `MarketDataProvider`
//! - **Explicit about declines**: every "no data" carries a typed reason
//!
//! The HTML scrape source sits behind the same trait as the JSON APIs, so it
//! can be dropped from the priority lists without touching the orchestrator.

mod capabilities;
mod traits;
pub(crate) mod util;

pub mod alpha_vantage;
pub mod finnhub;
pub mod google_finance;
pub mod polygon;

// Re-exports
pub use capabilities::{ProviderCapabilities, RateLimit};
pub use traits::MarketDataProvider;
