//! Symbol conventions for the supported universe.
//!
//! Turkish exchange tickers carry the `.IS` suffix (`THYAO.IS`), commodities
//! contain `=` (`GC=F`), everything else is a global ticker.

/// Suffix marking Borsa Istanbul listings.
pub const BIST_SUFFIX: &str = ".IS";

/// Character marking commodity tickers.
pub const COMMODITY_MARKER: char = '=';

/// Coarse symbol class used by provider coverage rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolClass {
    Bist,
    Commodity,
    Global,
}

impl SymbolClass {
    pub fn of(symbol: &str) -> Self {
        if symbol.ends_with(BIST_SUFFIX) {
            SymbolClass::Bist
        } else if symbol.contains(COMMODITY_MARKER) {
            SymbolClass::Commodity
        } else {
            SymbolClass::Global
        }
    }
}

/// Strip the BIST suffix, returning the bare exchange ticker.
pub fn bist_ticker(symbol: &str) -> Option<&str> {
    symbol.strip_suffix(BIST_SUFFIX)
}
