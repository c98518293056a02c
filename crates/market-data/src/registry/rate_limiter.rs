//! Fixed-interval rate limiter for market data providers.
//!
//! Each provider gets a slot holding the instant of its last call. Two calls
//! to the same provider are spaced by at least the provider's minimum
//! interval; there is no burst allowance. Different providers never wait on
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::models::ProviderId;

/// Default minimum interval between two calls to one provider.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Last-call instant for one provider. The async lock is held across the
/// wait, so concurrent callers of one provider queue up behind each other.
type Slot = Arc<tokio::sync::Mutex<Option<Instant>>>;

/// Per-provider fixed-interval rate limiter.
///
/// Thread-safe; slots are created on first use with the default interval,
/// or can be pre-configured per provider.
pub struct RateLimiter {
    default_interval: Duration,
    /// Per-provider interval overrides.
    intervals: Mutex<HashMap<String, Duration>>,
    /// Per-provider last-call slots.
    slots: Mutex<HashMap<String, Slot>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    /// Create a limiter applying `default_interval` to every provider.
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            intervals: Mutex::new(HashMap::new()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the slots mutex, recovering from poison if necessary.
    ///
    /// The map only holds `Arc`s, so a poisoned guard is still consistent.
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter slots mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Lock the intervals mutex, recovering from poison if necessary.
    fn lock_intervals(&self) -> MutexGuard<'_, HashMap<String, Duration>> {
        self.intervals.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter intervals mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the minimum interval for a specific provider.
    pub fn configure(&self, provider: &ProviderId, min_interval: Duration) {
        self.lock_intervals()
            .insert(provider.to_string(), min_interval);
    }

    /// Minimum interval in effect for a provider.
    pub fn interval_for(&self, provider: &ProviderId) -> Duration {
        self.lock_intervals()
            .get(provider.as_ref())
            .copied()
            .unwrap_or(self.default_interval)
    }

    fn slot(&self, provider: &ProviderId) -> Slot {
        self.lock_slots()
            .entry(provider.to_string())
            .or_default()
            .clone()
    }

    /// Wait until a call to `provider` is allowed, then record it.
    ///
    /// The first call for a provider proceeds immediately. The call instant
    /// is recorded after the wait, so intervals are measured between actual
    /// request starts.
    pub async fn acquire(&self, provider: &ProviderId) {
        let interval = self.interval_for(provider);
        let slot = self.slot(provider);
        let mut last_call = slot.lock().await;

        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!("Rate limiter: waiting {:?} for provider '{}'", wait, provider);
                tokio::time::sleep(wait).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
