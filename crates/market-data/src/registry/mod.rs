//! Provider orchestration module.
//!
//! This module sequences market data providers, including:
//! - Priority ordering and fallback across providers
//! - Fixed-interval rate limiting per provider
//! - Skip/decline diagnostics and per-provider counters

mod orchestrator;
mod rate_limiter;
mod skip_reason;

pub use orchestrator::{FetchOrchestrator, ProviderOrder, ProviderStats};
pub use rate_limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use skip_reason::{FetchDiagnostics, ProviderAttempt, SkipReason};
