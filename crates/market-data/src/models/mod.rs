//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Provider identity (ProviderKind) and the ProviderId alias
//! - `symbol` - Symbol classes and exchange suffix conventions
//! - `quote` - Normalized quote record and change percentage helper
//! - `candle` - Candle and History records
//! - `period` - History periods, resolutions and request windows

mod candle;
mod period;
mod quote;
mod symbol;
mod types;

pub use candle::{Candle, History};
pub use period::{HistoryPeriod, HistoryWindow, Resolution};
pub use quote::{change_pct, Quote, PRICE_DP};
pub use symbol::{bist_ticker, SymbolClass, BIST_SUFFIX, COMMODITY_MARKER};
pub use types::{ProviderId, ProviderKind};
