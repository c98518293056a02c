//! Background scheduler for periodic market snapshot refresh.
//!
//! Keeps the quick tier warm so most requests are served from cache.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use crate::main_lib::AppState;
use crate::market_service::Tier;

/// Starts the background refresh of the quick tier.
///
/// The first tick is immediate, so the cache is warmed at startup.
pub fn start_refresh_scheduler(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Market refresh scheduler started ({:?} interval)", every);

        let mut refresh_interval = interval(every);
        // A slow batch must not trigger a burst of catch-up refreshes
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            refresh_interval.tick().await;
            run_scheduled_refresh(&state).await;
        }
    })
}

/// Runs a single scheduled refresh.
async fn run_scheduled_refresh(state: &Arc<AppState>) {
    info!("Running scheduled market refresh...");
    let quotes = state.market_service.refresh(Tier::Quick).await;
    info!("Scheduled market refresh completed: {} quotes", quotes.len());
}
