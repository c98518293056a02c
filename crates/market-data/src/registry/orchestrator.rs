//! Fetch orchestrator for market data providers.
//!
//! The orchestrator owns the provider adapters and the rate limiter, and
//! handles:
//! - Priority ordering, separately for quotes and history
//! - Eligibility checks (credential, coverage, capability) before any request
//! - Fallback to the next provider on any decline, one attempt per provider
//! - Diagnostic tracking and per-provider counters

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;

use super::{FetchDiagnostics, RateLimiter, SkipReason};
use crate::errors::MarketDataError;
use crate::models::{Candle, History, HistoryPeriod, HistoryWindow, ProviderId, ProviderKind, Quote};
use crate::provider::MarketDataProvider;

/// Provider priority lists, highest priority first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderOrder {
    pub quotes: Vec<ProviderKind>,
    pub history: Vec<ProviderKind>,
}

impl ProviderOrder {
    /// Drop repeated providers, keeping the first occurrence.
    pub fn deduplicated(self) -> Self {
        Self {
            quotes: dedup_kinds(self.quotes),
            history: dedup_kinds(self.history),
        }
    }
}

fn dedup_kinds(kinds: Vec<ProviderKind>) -> Vec<ProviderKind> {
    let mut seen = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if seen.contains(&kind) {
            warn!("Provider '{}' listed twice in priority order, ignoring repeat", kind);
        } else {
            seen.push(kind);
        }
    }
    seen
}

impl Default for ProviderOrder {
    /// Scrape source first for quotes (the only real-time BIST source), then
    /// the APIs by call-rate headroom. History only from the candle APIs.
    fn default() -> Self {
        Self {
            quotes: vec![
                ProviderKind::GoogleFinance,
                ProviderKind::Finnhub,
                ProviderKind::AlphaVantage,
                ProviderKind::Polygon,
            ],
            history: vec![ProviderKind::Finnhub, ProviderKind::Polygon],
        }
    }
}

/// Snapshot of one provider's outcome counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub provider: ProviderKind,
    pub configured: bool,
    pub successes: u64,
    pub failures: u64,
    pub skips: u64,
}

#[derive(Default)]
struct Counters {
    successes: AtomicU64,
    failures: AtomicU64,
    skips: AtomicU64,
}

/// Which operation an eligibility check is for.
#[derive(Clone, Copy)]
enum Operation {
    Latest,
    History,
}

/// Orchestrates market data fetching across providers.
pub struct FetchOrchestrator {
    providers: HashMap<ProviderKind, Arc<dyn MarketDataProvider>>,
    order: ProviderOrder,
    rate_limiter: RateLimiter,
    counters: HashMap<ProviderKind, Counters>,
}

impl FetchOrchestrator {
    /// Create a new orchestrator with the default rate limiter.
    ///
    /// Priority lists are de-duplicated, keeping the first occurrence, so a
    /// provider is tried at most once per call.
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>, order: ProviderOrder) -> Self {
        let counters = providers
            .iter()
            .map(|p| (p.kind(), Counters::default()))
            .collect();
        let providers = providers.into_iter().map(|p| (p.kind(), p)).collect();

        let orchestrator = Self {
            providers,
            order: order.deduplicated(),
            rate_limiter: RateLimiter::default(),
            counters,
        };
        orchestrator.apply_provider_limits();
        orchestrator
    }

    /// Replace the rate limiter (e.g. one built from configuration).
    ///
    /// Intervals declared by providers through `rate_limit()` are applied
    /// on top of the new limiter's default.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self.apply_provider_limits();
        self
    }

    fn apply_provider_limits(&self) {
        for provider in self.providers.values() {
            if let Some(limit) = provider.rate_limit() {
                let provider_id: ProviderId = Cow::Borrowed(provider.id());
                self.rate_limiter.configure(&provider_id, limit.min_interval);
            }
        }
    }

    pub fn order(&self) -> &ProviderOrder {
        &self.order
    }

    /// Fetch the latest quote for a symbol.
    ///
    /// Returns `None` when every provider declined; that means "no data
    /// available", not an error.
    pub async fn fetch_price(&self, symbol: &str) -> Option<Quote> {
        self.fetch_price_with_diagnostics(symbol).await.0
    }

    /// Fetch the latest quote for a symbol with diagnostics.
    pub async fn fetch_price_with_diagnostics(
        &self,
        symbol: &str,
    ) -> (Option<Quote>, FetchDiagnostics) {
        let mut diagnostics = FetchDiagnostics::new();

        for kind in &self.order.quotes {
            let Some(provider) = self.eligible(*kind, symbol, Operation::Latest, &mut diagnostics)
            else {
                continue;
            };
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            self.rate_limiter.acquire(&provider_id).await;

            match provider.get_quote(symbol).await {
                Ok(quote) => {
                    self.record_success(*kind);
                    diagnostics.record_success(provider_id);
                    debug!("Quote for {}: {}", symbol, diagnostics.summary());
                    return (Some(quote), diagnostics);
                }
                Err(e) => self.record_failure(*kind, provider_id, symbol, e, &mut diagnostics),
            }
        }

        info!(
            "No quote available for {}. Diagnostics: {}",
            symbol,
            diagnostics.summary()
        );
        (None, diagnostics)
    }

    /// Fetch candle history for a symbol over a coarse period ending now.
    pub async fn fetch_history(&self, symbol: &str, period: HistoryPeriod) -> Option<History> {
        self.fetch_history_with_diagnostics(symbol, period).await.0
    }

    /// Fetch candle history with diagnostics.
    pub async fn fetch_history_with_diagnostics(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> (Option<History>, FetchDiagnostics) {
        let window = HistoryWindow::ending_now(period);
        self.fetch_history_in_window(symbol, &window).await
    }

    /// Fetch candle history for an explicit window.
    ///
    /// A rate-limited provider is a soft failure like any other: the next
    /// provider in the history order is tried.
    pub async fn fetch_history_in_window(
        &self,
        symbol: &str,
        window: &HistoryWindow,
    ) -> (Option<History>, FetchDiagnostics) {
        let mut diagnostics = FetchDiagnostics::new();

        for kind in &self.order.history {
            let Some(provider) =
                self.eligible(*kind, symbol, Operation::History, &mut diagnostics)
            else {
                continue;
            };
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            self.rate_limiter.acquire(&provider_id).await;

            match provider.get_history(symbol, window).await {
                Ok(candles) if !candles.is_empty() => {
                    self.record_success(*kind);
                    diagnostics.record_success(provider_id);
                    return (Some(history(symbol, candles)), diagnostics);
                }
                Ok(_) => {
                    let e = MarketDataError::NoData {
                        provider: provider_id.to_string(),
                        symbol: symbol.to_string(),
                    };
                    self.record_failure(*kind, provider_id, symbol, e, &mut diagnostics);
                }
                Err(e) => self.record_failure(*kind, provider_id, symbol, e, &mut diagnostics),
            }
        }

        info!(
            "No {} history available for {}. Diagnostics: {}",
            window.period,
            symbol,
            diagnostics.summary()
        );
        (None, diagnostics)
    }

    /// Fetch latest quotes for many symbols with a bounded worker pool.
    ///
    /// Results keep the input order; symbols without data are dropped.
    /// Per-provider spacing still holds across workers because they share
    /// this orchestrator's rate limiter.
    pub async fn fetch_prices(&self, symbols: &[String], concurrency: usize) -> Vec<Quote> {
        // Owned symbols keep the worker futures `Send` for spawned tasks and handlers
        let mut results: Vec<(usize, Option<Quote>)> =
            stream::iter(symbols.iter().cloned().enumerate())
                .map(|(index, symbol)| async move { (index, self.fetch_price(&symbol).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let quotes: Vec<Quote> = results.into_iter().filter_map(|(_, q)| q).collect();

        debug!(
            "Batch fetch: {} of {} symbols returned quotes",
            quotes.len(),
            symbols.len()
        );
        quotes
    }

    /// Per-provider counters, in canonical provider order.
    pub fn stats(&self) -> Vec<ProviderStats> {
        ProviderKind::ALL
            .iter()
            .filter_map(|kind| {
                let provider = self.providers.get(kind)?;
                let counters = self.counters.get(kind)?;
                Some(ProviderStats {
                    provider: *kind,
                    configured: provider.is_configured(),
                    successes: counters.successes.load(Ordering::Relaxed),
                    failures: counters.failures.load(Ordering::Relaxed),
                    skips: counters.skips.load(Ordering::Relaxed),
                })
            })
            .collect()
    }

    /// Providers that have their credential (or need none).
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .iter()
            .copied()
            .filter(|kind| {
                self.providers
                    .get(kind)
                    .is_some_and(|provider| provider.is_configured())
            })
            .collect()
    }

    /// Resolve a provider and check it can serve `symbol` without a network call.
    ///
    /// Records a skip and returns `None` otherwise.
    fn eligible(
        &self,
        kind: ProviderKind,
        symbol: &str,
        operation: Operation,
        diagnostics: &mut FetchDiagnostics,
    ) -> Option<&Arc<dyn MarketDataProvider>> {
        let provider_id: ProviderId = Cow::Borrowed(kind.id());

        let Some(provider) = self.providers.get(&kind) else {
            diagnostics.record_skip(provider_id, SkipReason::NotRegistered);
            return None;
        };

        let capabilities = provider.capabilities();
        let unsupported = match operation {
            Operation::Latest if !capabilities.supports_latest => {
                Some(SkipReason::LatestNotSupported)
            }
            Operation::History if !capabilities.supports_history => {
                Some(SkipReason::HistoryNotSupported)
            }
            _ => None,
        };

        let reason = match unsupported {
            Some(reason) => reason,
            None => match provider.check_eligible(symbol) {
                Ok(_) => return Some(provider),
                Err(e) => SkipReason::from_error(&e, symbol).unwrap_or(SkipReason::CoverageGap {
                    symbol: symbol.to_string(),
                }),
            },
        };

        debug!("Skipping provider '{}' for {}: {}", provider_id, symbol, reason);
        if let Some(counters) = self.counters.get(&kind) {
            counters.skips.fetch_add(1, Ordering::Relaxed);
        }
        diagnostics.record_skip(provider_id, reason);
        None
    }

    fn record_success(&self, kind: ProviderKind) {
        if let Some(counters) = self.counters.get(&kind) {
            counters.successes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_failure(
        &self,
        kind: ProviderKind,
        provider_id: ProviderId,
        symbol: &str,
        error: MarketDataError,
        diagnostics: &mut FetchDiagnostics,
    ) {
        match &error {
            MarketDataError::RateLimited { .. } => {
                warn!("Provider '{}' rate limited on {}, trying next", provider_id, symbol)
            }
            _ => debug!(
                "Provider '{}' declined {}: {}, trying next",
                provider_id, symbol, error
            ),
        }
        if let Some(counters) = self.counters.get(&kind) {
            counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        diagnostics.record_error(provider_id, error.to_string());
    }
}

fn history(symbol: &str, candles: Vec<Candle>) -> History {
    History {
        symbol: symbol.to_string(),
        history: candles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SymbolClass;
    use crate::provider::{ProviderCapabilities, RateLimit};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[derive(Clone, Copy)]
    enum Outcome {
        Price(Decimal),
        Fail,
        RateLimited,
        Timeout,
    }

    struct MockProvider {
        kind: ProviderKind,
        classes: &'static [SymbolClass],
        configured: bool,
        supports_history: bool,
        min_interval: Option<Duration>,
        outcome: Outcome,
        call_count: AtomicUsize,
    }

    const ALL_CLASSES: &[SymbolClass] =
        &[SymbolClass::Bist, SymbolClass::Commodity, SymbolClass::Global];
    const NO_BIST: &[SymbolClass] = &[SymbolClass::Commodity, SymbolClass::Global];

    impl MockProvider {
        fn new(kind: ProviderKind, outcome: Outcome) -> Self {
            Self {
                kind,
                classes: ALL_CLASSES,
                configured: true,
                supports_history: true,
                min_interval: None,
                outcome,
                call_count: AtomicUsize::new(0),
            }
        }

        fn covering(mut self, classes: &'static [SymbolClass]) -> Self {
            self.classes = classes;
            self
        }

        fn unconfigured(mut self) -> Self {
            self.configured = false;
            self
        }

        fn quotes_only(mut self) -> Self {
            self.supports_history = false;
            self
        }

        fn spaced(mut self, min_interval: Duration) -> Self {
            self.min_interval = Some(min_interval);
            self
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn result<T>(&self, ok: impl FnOnce(Decimal) -> T) -> Result<T, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Price(price) => Ok(ok(price)),
                Outcome::Fail => Err(MarketDataError::ProviderError {
                    provider: self.id().to_string(),
                    message: "Mock failure".to_string(),
                }),
                Outcome::RateLimited => Err(MarketDataError::RateLimited {
                    provider: self.id().to_string(),
                }),
                Outcome::Timeout => Err(MarketDataError::Timeout {
                    provider: self.id().to_string(),
                }),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                symbol_classes: self.classes,
                supports_latest: true,
                supports_history: self.supports_history,
            }
        }

        fn rate_limit(&self) -> Option<RateLimit> {
            self.min_interval.map(|min_interval| RateLimit { min_interval })
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn provider_symbol(&self, symbol: &str) -> Result<String, MarketDataError> {
            Ok(symbol.to_string())
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            self.result(|price| Quote::new(symbol, price, self.kind))
        }

        async fn get_history(
            &self,
            _symbol: &str,
            window: &HistoryWindow,
        ) -> Result<Vec<Candle>, MarketDataError> {
            self.result(|price| {
                Candle::from_bar(
                    window.end.timestamp(),
                    window.resolution,
                    price,
                    price,
                    price,
                    price,
                )
                .into_iter()
                .collect()
            })
        }
    }

    fn orchestrator(providers: &[Arc<MockProvider>]) -> FetchOrchestrator {
        let providers = providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn MarketDataProvider>)
            .collect();
        FetchOrchestrator::new(providers, ProviderOrder::default())
            .with_rate_limiter(RateLimiter::new(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let scrape = Arc::new(MockProvider::new(ProviderKind::GoogleFinance, Outcome::Fail));
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(10))));
        let alpha = Arc::new(MockProvider::new(ProviderKind::AlphaVantage, Outcome::Price(dec!(11))));
        let polygon = Arc::new(MockProvider::new(ProviderKind::Polygon, Outcome::Price(dec!(12))));
        let orch = orchestrator(&[scrape.clone(), finnhub.clone(), alpha.clone(), polygon.clone()]);

        let quote = orch.fetch_price("AAPL").await.unwrap();
        assert_eq!(quote.source, ProviderKind::Finnhub);
        assert_eq!(quote.price, dec!(10));
        assert_eq!(scrape.calls(), 1);
        assert_eq!(finnhub.calls(), 1);
        assert_eq!(alpha.calls(), 0);
        assert_eq!(polygon.calls(), 0);
    }

    #[tokio::test]
    async fn test_bist_symbol_consults_scrape_first() {
        let scrape = Arc::new(
            MockProvider::new(ProviderKind::GoogleFinance, Outcome::Price(dec!(312.5)))
                .covering(&[SymbolClass::Bist]),
        );
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(1))));
        let alpha = Arc::new(MockProvider::new(ProviderKind::AlphaVantage, Outcome::Price(dec!(1))));
        let polygon = Arc::new(MockProvider::new(ProviderKind::Polygon, Outcome::Price(dec!(1))));
        let orch = orchestrator(&[scrape.clone(), finnhub.clone(), alpha.clone(), polygon.clone()]);

        let quote = orch.fetch_price("THYAO.IS").await.unwrap();
        assert_eq!(quote.source, ProviderKind::GoogleFinance);
        assert_eq!(finnhub.calls() + alpha.calls() + polygon.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_key_falls_through_to_next_provider() {
        let scrape = Arc::new(
            MockProvider::new(ProviderKind::GoogleFinance, Outcome::Price(dec!(1)))
                .covering(&[SymbolClass::Bist]),
        );
        let finnhub = Arc::new(
            MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(1))).unconfigured(),
        );
        let alpha = Arc::new(MockProvider::new(
            ProviderKind::AlphaVantage,
            Outcome::Price(dec!(150.25)),
        ));
        let polygon = Arc::new(MockProvider::new(ProviderKind::Polygon, Outcome::Price(dec!(1))));
        let orch = orchestrator(&[scrape.clone(), finnhub.clone(), alpha.clone(), polygon.clone()]);

        let (quote, diagnostics) = orch.fetch_price_with_diagnostics("AAPL").await;
        let quote = quote.unwrap();
        assert_eq!(quote.source, ProviderKind::AlphaVantage);
        assert_eq!(quote.price, dec!(150.25));

        // Neither the scrape source (coverage) nor Finnhub (no key) was called
        assert_eq!(scrape.calls(), 0);
        assert_eq!(finnhub.calls(), 0);
        assert_eq!(polygon.calls(), 0);
        assert_eq!(
            diagnostics.summary(),
            "GOOGLE_FINANCE: SKIPPED (no coverage for AAPL) -> FINNHUB: SKIPPED (missing credential) -> ALPHA_VANTAGE: SUCCESS"
        );
    }

    #[tokio::test]
    async fn test_exhaustion_returns_none() {
        let scrape = Arc::new(
            MockProvider::new(ProviderKind::GoogleFinance, Outcome::Fail)
                .covering(&[SymbolClass::Bist]),
        );
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Fail));
        let alpha = Arc::new(
            MockProvider::new(ProviderKind::AlphaVantage, Outcome::Fail).covering(NO_BIST),
        );
        let polygon = Arc::new(
            MockProvider::new(ProviderKind::Polygon, Outcome::RateLimited).covering(NO_BIST),
        );
        let orch = orchestrator(&[scrape.clone(), finnhub.clone(), alpha.clone(), polygon.clone()]);

        let (quote, diagnostics) = orch.fetch_price_with_diagnostics("XYZQ.IS").await;
        assert!(quote.is_none());
        assert!(!diagnostics.has_success());
        assert_eq!(scrape.calls(), 1);
        assert_eq!(finnhub.calls(), 1);
        // Coverage gaps never reach the network
        assert_eq!(alpha.calls(), 0);
        assert_eq!(polygon.calls(), 0);
        assert_eq!(diagnostics.errors().len(), 2);
        assert_eq!(diagnostics.skip_reasons().len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_provider_is_skipped() {
        let polygon = Arc::new(MockProvider::new(ProviderKind::Polygon, Outcome::Price(dec!(5))));
        let orch = orchestrator(&[polygon.clone()]);

        let (quote, diagnostics) = orch.fetch_price_with_diagnostics("MSFT").await;
        assert_eq!(quote.unwrap().source, ProviderKind::Polygon);
        assert_eq!(diagnostics.skip_reasons().len(), 3);
        assert!(diagnostics
            .skip_reasons()
            .iter()
            .all(|(_, reason)| **reason == SkipReason::NotRegistered));
    }

    #[tokio::test]
    async fn test_history_rate_limit_is_soft_failure() {
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::RateLimited));
        let polygon = Arc::new(MockProvider::new(ProviderKind::Polygon, Outcome::Price(dec!(7))));
        let orch = orchestrator(&[finnhub.clone(), polygon.clone()]);

        let history = orch.fetch_history("AAPL", HistoryPeriod::OneYear).await.unwrap();
        assert_eq!(history.symbol, "AAPL");
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].close, dec!(7));
        // Daily bars carry no time of day
        assert_eq!(history.history[0].time.len(), "2024-01-01".len());
        assert_eq!(finnhub.calls(), 1);
        assert_eq!(polygon.calls(), 1);
    }

    #[tokio::test]
    async fn test_history_skips_quote_only_providers() {
        let alpha = Arc::new(
            MockProvider::new(ProviderKind::AlphaVantage, Outcome::Price(dec!(1))).quotes_only(),
        );
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Fail));
        let orch = FetchOrchestrator::new(
            vec![
                alpha.clone() as Arc<dyn MarketDataProvider>,
                finnhub.clone() as Arc<dyn MarketDataProvider>,
            ],
            ProviderOrder {
                quotes: vec![],
                history: vec![ProviderKind::AlphaVantage, ProviderKind::Finnhub],
            },
        )
        .with_rate_limiter(RateLimiter::new(Duration::ZERO));

        let (history, diagnostics) = orch
            .fetch_history_with_diagnostics("AAPL", HistoryPeriod::OneDay)
            .await;
        assert!(history.is_none());
        assert_eq!(alpha.calls(), 0);
        assert_eq!(finnhub.calls(), 1);
        assert_eq!(
            diagnostics.skip_reasons()[0].1,
            &SkipReason::HistoryNotSupported
        );
    }

    #[tokio::test]
    async fn test_intraday_history_has_time_of_day() {
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(3))));
        let orch = orchestrator(&[finnhub]);

        let history = orch.fetch_history("AAPL", HistoryPeriod::OneDay).await.unwrap();
        assert_eq!(history.history[0].time.len(), "2024-01-01 09:15".len());
    }

    #[tokio::test]
    async fn test_fetch_prices_keeps_input_order_and_drops_missing() {
        let finnhub = Arc::new(
            MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(2))).covering(NO_BIST),
        );
        let orch = orchestrator(&[finnhub.clone()]);

        let symbols: Vec<String> = ["AAPL", "THYAO.IS", "MSFT", "GC=F"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let quotes = orch.fetch_prices(&symbols, 3).await;

        let returned: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(returned, vec!["AAPL", "MSFT", "GC=F"]);
        assert_eq!(finnhub.calls(), 3);
    }

    #[tokio::test]
    async fn test_stats_count_outcomes() {
        let scrape = Arc::new(
            MockProvider::new(ProviderKind::GoogleFinance, Outcome::Price(dec!(1)))
                .covering(&[SymbolClass::Bist]),
        );
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Fail));
        let polygon = Arc::new(
            MockProvider::new(ProviderKind::Polygon, Outcome::Price(dec!(1))).unconfigured(),
        );
        let orch = orchestrator(&[scrape, finnhub, polygon]);

        orch.fetch_price("THYAO.IS").await;
        orch.fetch_price("AAPL").await;

        let stats = orch.stats();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].provider, ProviderKind::GoogleFinance);
        assert_eq!((stats[0].successes, stats[0].skips), (1, 1));
        assert_eq!(stats[1].provider, ProviderKind::Finnhub);
        assert_eq!(stats[1].failures, 1);
        assert_eq!(stats[2].provider, ProviderKind::Polygon);
        assert!(!stats[2].configured);
        assert_eq!(stats[2].skips, 1);

        assert_eq!(
            orch.configured_providers(),
            vec![ProviderKind::GoogleFinance, ProviderKind::Finnhub]
        );
    }

    #[tokio::test]
    async fn test_timeout_falls_through_to_next_provider() {
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Timeout));
        let alpha = Arc::new(MockProvider::new(ProviderKind::AlphaVantage, Outcome::Price(dec!(9))));
        let orch = orchestrator(&[finnhub.clone(), alpha.clone()]);

        let (quote, diagnostics) = orch.fetch_price_with_diagnostics("AAPL").await;
        assert_eq!(quote.unwrap().source, ProviderKind::AlphaVantage);
        assert_eq!(finnhub.calls(), 1);
        let errors = diagnostics.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.as_ref(), "FINNHUB");
        assert_eq!(errors[0].1, "Timeout: FINNHUB");
    }

    #[tokio::test]
    async fn test_repeated_provider_in_order_is_tried_once() {
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Fail));
        let orch = FetchOrchestrator::new(
            vec![finnhub.clone() as Arc<dyn MarketDataProvider>],
            ProviderOrder {
                quotes: vec![ProviderKind::Finnhub, ProviderKind::Finnhub],
                history: vec![ProviderKind::Finnhub, ProviderKind::Polygon, ProviderKind::Finnhub],
            },
        )
        .with_rate_limiter(RateLimiter::new(Duration::ZERO));

        assert_eq!(orch.order().quotes, vec![ProviderKind::Finnhub]);
        assert_eq!(
            orch.order().history,
            vec![ProviderKind::Finnhub, ProviderKind::Polygon]
        );
        assert!(orch.fetch_price("AAPL").await.is_none());
        assert_eq!(finnhub.calls(), 1);
    }

    #[tokio::test]
    async fn test_declared_interval_survives_limiter_replacement() {
        let finnhub = Arc::new(
            MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(1)))
                .spaced(Duration::from_millis(200)),
        );
        let orch = orchestrator(&[finnhub.clone()]);

        let start = Instant::now();
        orch.fetch_price("AAPL").await;
        orch.fetch_price("MSFT").await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(finnhub.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_prices_runs_in_spawned_task() {
        let finnhub = Arc::new(MockProvider::new(ProviderKind::Finnhub, Outcome::Price(dec!(4))));
        let orch = Arc::new(orchestrator(&[finnhub.clone()]));
        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];

        let quotes = tokio::spawn(async move { orch.fetch_prices(&symbols, 2).await })
            .await
            .unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(finnhub.calls(), 2);
    }
}
