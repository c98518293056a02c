use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use wolfee_market_data::{
    AlphaVantageProvider, FetchOrchestrator, FinnhubProvider, GoogleFinanceProvider,
    MarketDataProvider, PolygonProvider, RateLimiter,
};

use crate::config::Config;
use crate::market_service::{MarketService, ServiceSettings};

pub struct AppState {
    pub market_service: Arc<MarketService>,
}

pub fn init_tracing() {
    let log_format = std::env::var("WOLFEE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Instantiate the four adapters, honouring base URL overrides.
fn build_providers(config: &Config) -> Vec<Arc<dyn MarketDataProvider>> {
    let endpoints = &config.endpoints;

    let google = match &endpoints.google_finance {
        Some(url) => GoogleFinanceProvider::with_base_url(url),
        None => GoogleFinanceProvider::new(),
    };
    let finnhub = match &endpoints.finnhub {
        Some(url) => FinnhubProvider::with_base_url(config.finnhub_api_key.clone(), url),
        None => FinnhubProvider::new(config.finnhub_api_key.clone()),
    };
    let alpha_vantage = match &endpoints.alpha_vantage {
        Some(url) => AlphaVantageProvider::with_base_url(config.alpha_vantage_api_key.clone(), url),
        None => AlphaVantageProvider::new(config.alpha_vantage_api_key.clone()),
    };
    let polygon = match &endpoints.polygon {
        Some(url) => PolygonProvider::with_base_url(config.polygon_api_key.clone(), url),
        None => PolygonProvider::new(config.polygon_api_key.clone()),
    };

    let providers: [Arc<dyn MarketDataProvider>; 4] = [
        Arc::new(google),
        Arc::new(finnhub),
        Arc::new(alpha_vantage),
        Arc::new(polygon),
    ];
    providers.into()
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let providers = build_providers(config);
    for provider in &providers {
        if provider.is_configured() {
            tracing::info!("Market data provider {} enabled", provider.id());
        } else {
            tracing::warn!("Market data provider {} disabled: no API key", provider.id());
        }
    }

    let orchestrator = FetchOrchestrator::new(providers, config.provider_order.clone())
        .with_rate_limiter(RateLimiter::new(config.min_interval));
    tracing::info!(
        "Provider order: quotes {:?}, history {:?}",
        config.provider_order.quotes,
        config.provider_order.history
    );

    let market_service = Arc::new(MarketService::new(
        Arc::new(orchestrator),
        config.universe.clone(),
        ServiceSettings {
            cache_ttl: config.cache_ttl,
            batch_concurrency: config.batch_concurrency,
            quick_global_limit: config.quick_global_limit,
        },
    ));

    Arc::new(AppState { market_service })
}
