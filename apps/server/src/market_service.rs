//! Market snapshot service.
//!
//! Wraps the fetch orchestrator with the symbol universe and a time-boxed
//! in-memory cache of two batch tiers:
//! - `quick`: every BIST symbol, the first N global symbols and the commodities
//! - `full`: the whole universe

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use wolfee_market_data::{
    FetchOrchestrator, History, HistoryPeriod, Quote, BIST_SUFFIX, COMMODITY_MARKER,
};

const DEFAULT_BIST: [&str; 10] = [
    "THYAO.IS", "GARAN.IS", "ASELS.IS", "AKBNK.IS", "EREGL.IS", "KCHOL.IS", "SISE.IS",
    "TUPRS.IS", "BIMAS.IS", "YKBNK.IS",
];
const DEFAULT_GLOBAL: [&str; 7] = ["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA"];
const DEFAULT_COMMODITIES: [&str; 5] = ["GC=F", "SI=F", "CL=F", "NG=F", "HG=F"];

/// The symbols the service knows about, in display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SymbolUniverse {
    pub bist: Vec<String>,
    pub global: Vec<String>,
    pub commodities: Vec<String>,
}

impl Default for SymbolUniverse {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            bist: owned(&DEFAULT_BIST),
            global: owned(&DEFAULT_GLOBAL),
            commodities: owned(&DEFAULT_COMMODITIES),
        }
    }
}

impl SymbolUniverse {
    /// Build a universe, upper-casing tickers and adding the BIST suffix where missing.
    pub fn new(bist: Vec<String>, global: Vec<String>, commodities: Vec<String>) -> Self {
        let upper = |list: Vec<String>| -> Vec<String> {
            list.into_iter().map(|s| s.trim().to_uppercase()).collect()
        };
        let bist = upper(bist)
            .into_iter()
            .map(|s| {
                if s.ends_with(BIST_SUFFIX) {
                    s
                } else {
                    format!("{}{}", s, BIST_SUFFIX)
                }
            })
            .collect();
        Self {
            bist,
            global: upper(global),
            commodities: upper(commodities),
        }
    }

    /// Canonical form of a symbol taken from a URL.
    ///
    /// A bare ticker that is neither a commodity nor a known global symbol
    /// is taken to be a BIST listing.
    pub fn normalize(&self, raw: &str) -> String {
        let symbol = raw.trim().to_uppercase();
        if symbol.ends_with(BIST_SUFFIX)
            || symbol.contains(COMMODITY_MARKER)
            || self.global.contains(&symbol)
        {
            symbol
        } else {
            format!("{}{}", symbol, BIST_SUFFIX)
        }
    }
}

/// Batch tier of the snapshot cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Quick,
    Full,
}

#[derive(Clone)]
struct Snapshot {
    quotes: Arc<Vec<Quote>>,
    fetched_at: Instant,
}

#[derive(Default)]
struct TierCache {
    entry: RwLock<Option<Snapshot>>,
    /// Held while a tier is being fetched so concurrent misses wait for one fetch.
    refreshing: Mutex<()>,
}

impl TierCache {
    /// Cached quotes younger than `ttl`. An empty batch never counts as fresh.
    async fn fresh(&self, ttl: Duration) -> Option<Arc<Vec<Quote>>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|s| !s.quotes.is_empty() && s.fetched_at.elapsed() < ttl)
            .map(|s| Arc::clone(&s.quotes))
    }
}

/// Tuning knobs for [`MarketService`].
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub cache_ttl: Duration,
    pub batch_concurrency: usize,
    pub quick_global_limit: usize,
}

pub struct MarketService {
    orchestrator: Arc<FetchOrchestrator>,
    universe: SymbolUniverse,
    settings: ServiceSettings,
    quick: TierCache,
    full: TierCache,
}

impl MarketService {
    pub fn new(
        orchestrator: Arc<FetchOrchestrator>,
        universe: SymbolUniverse,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            orchestrator,
            universe,
            settings,
            quick: TierCache::default(),
            full: TierCache::default(),
        }
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    /// Symbols of a tier, BIST first, then global, then commodities.
    pub fn symbols(&self, tier: Tier) -> Vec<String> {
        let global_count = match tier {
            Tier::Quick => self.settings.quick_global_limit.min(self.universe.global.len()),
            Tier::Full => self.universe.global.len(),
        };
        self.universe
            .bist
            .iter()
            .chain(&self.universe.global[..global_count])
            .chain(&self.universe.commodities)
            .cloned()
            .collect()
    }

    fn cache(&self, tier: Tier) -> &TierCache {
        match tier {
            Tier::Quick => &self.quick,
            Tier::Full => &self.full,
        }
    }

    /// Quotes of a tier, from cache when fresh.
    pub async fn snapshot(&self, tier: Tier) -> Arc<Vec<Quote>> {
        let cache = self.cache(tier);
        if let Some(quotes) = cache.fresh(self.settings.cache_ttl).await {
            debug!("Serving {:?} tier from cache ({} quotes)", tier, quotes.len());
            return quotes;
        }

        let _refreshing = cache.refreshing.lock().await;
        // Another caller may have filled the cache while we waited
        if let Some(quotes) = cache.fresh(self.settings.cache_ttl).await {
            return quotes;
        }
        self.fetch_into(tier, cache).await
    }

    /// Refetch a tier regardless of cache age.
    pub async fn refresh(&self, tier: Tier) -> Arc<Vec<Quote>> {
        let cache = self.cache(tier);
        let _refreshing = cache.refreshing.lock().await;
        self.fetch_into(tier, cache).await
    }

    async fn fetch_into(&self, tier: Tier, cache: &TierCache) -> Arc<Vec<Quote>> {
        let symbols = self.symbols(tier);
        let started = Instant::now();
        let quotes = Arc::new(
            self.orchestrator
                .fetch_prices(&symbols, self.settings.batch_concurrency)
                .await,
        );
        info!(
            "Fetched {:?} tier: {} of {} symbols in {:?}",
            tier,
            quotes.len(),
            symbols.len(),
            started.elapsed()
        );

        *cache.entry.write().await = Some(Snapshot {
            quotes: Arc::clone(&quotes),
            fetched_at: Instant::now(),
        });
        quotes
    }

    /// Latest quote for a symbol as typed in a URL.
    pub async fn quote(&self, raw_symbol: &str) -> Option<Quote> {
        let symbol = self.universe.normalize(raw_symbol);
        self.orchestrator.fetch_price(&symbol).await
    }

    /// Candle history for a symbol as typed in a URL.
    pub async fn history(&self, raw_symbol: &str, period: HistoryPeriod) -> Option<History> {
        let symbol = self.universe.normalize(raw_symbol);
        self.orchestrator.fetch_history(&symbol, period).await
    }
}
