//! Server configuration loaded from the process environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use wolfee_market_data::{ProviderKind, ProviderOrder};

use crate::market_service::SymbolUniverse;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Upstream base URL overrides. `None` uses the provider's public endpoint.
#[derive(Clone, Debug, Default)]
pub struct ProviderEndpoints {
    pub google_finance: Option<String>,
    pub finnhub: Option<String>,
    pub alpha_vantage: Option<String>,
    pub polygon: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub finnhub_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub polygon_api_key: Option<String>,
    /// Minimum spacing between two calls to the same provider.
    pub min_interval: Duration,
    pub provider_order: ProviderOrder,
    pub cache_ttl: Duration,
    /// Background refresh period of the quick tier; `None` disables it.
    pub refresh_interval: Option<Duration>,
    /// Symbols fetched concurrently in a batch.
    pub batch_concurrency: usize,
    /// Global symbols included in the quick tier.
    pub quick_global_limit: usize,
    pub universe: SymbolUniverse,
    pub endpoints: ProviderEndpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            finnhub_api_key: None,
            alpha_vantage_api_key: None,
            polygon_api_key: None,
            min_interval: Duration::from_secs(1),
            provider_order: ProviderOrder::default(),
            cache_ttl: Duration::from_secs(300),
            refresh_interval: Some(Duration::from_secs(300)),
            batch_concurrency: 4,
            quick_global_limit: 100,
            universe: SymbolUniverse::default(),
            endpoints: ProviderEndpoints::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment (and a `.env` file if present).
    ///
    /// Absent variables fall back to defaults; present but unparseable ones
    /// are an error.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let listen_addr = env_or("WOLFEE_LISTEN_ADDR", DEFAULT_LISTEN_ADDR)
            .parse()
            .context("WOLFEE_LISTEN_ADDR must be a socket address")?;

        let provider_order = ProviderOrder {
            quotes: match env_value("WOLFEE_QUOTE_PROVIDERS") {
                Some(raw) => parse_provider_list(&raw).context("WOLFEE_QUOTE_PROVIDERS")?,
                None => defaults.provider_order.quotes,
            },
            history: match env_value("WOLFEE_HISTORY_PROVIDERS") {
                Some(raw) => parse_provider_list(&raw).context("WOLFEE_HISTORY_PROVIDERS")?,
                None => defaults.provider_order.history,
            },
        };

        let refresh_secs: u64 = env_parse("WOLFEE_REFRESH_INTERVAL_SECS", 300)?;

        let universe = SymbolUniverse::new(
            env_list("WOLFEE_BIST_SYMBOLS").unwrap_or(defaults.universe.bist),
            env_list("WOLFEE_GLOBAL_SYMBOLS").unwrap_or(defaults.universe.global),
            env_list("WOLFEE_COMMODITY_SYMBOLS").unwrap_or(defaults.universe.commodities),
        );

        Ok(Self {
            listen_addr,
            finnhub_api_key: env_value("FINNHUB_API_KEY"),
            alpha_vantage_api_key: env_value("ALPHA_VANTAGE_API_KEY"),
            polygon_api_key: env_value("POLYGON_API_KEY"),
            min_interval: Duration::from_millis(env_parse("WOLFEE_MIN_INTERVAL_MS", 1000)?),
            provider_order,
            cache_ttl: Duration::from_secs(env_parse("WOLFEE_CACHE_TTL_SECS", 300)?),
            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            batch_concurrency: env_parse("WOLFEE_BATCH_CONCURRENCY", 4)?,
            quick_global_limit: env_parse("WOLFEE_QUICK_GLOBAL_LIMIT", 100)?,
            universe,
            endpoints: ProviderEndpoints {
                google_finance: env_value("GOOGLE_FINANCE_BASE_URL"),
                finnhub: env_value("FINNHUB_BASE_URL"),
                alpha_vantage: env_value("ALPHA_VANTAGE_BASE_URL"),
                polygon: env_value("POLYGON_BASE_URL"),
            },
        })
    }
}

/// Trimmed value of a variable; empty counts as unset.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_value(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_value(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env_value(key).map(|raw| split_list(&raw))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a comma list of provider ids, e.g. `google_finance,finnhub`.
///
/// A provider may appear only once.
pub fn parse_provider_list(raw: &str) -> anyhow::Result<Vec<ProviderKind>> {
    let mut kinds = Vec::new();
    for id in split_list(raw) {
        let kind = ProviderKind::from_str(&id).map_err(|e| anyhow!(e))?;
        if kinds.contains(&kind) {
            bail!("Provider '{}' listed more than once", kind);
        }
        kinds.push(kind);
    }
    Ok(kinds)
}
