//! Skip reason tracking for provider selection diagnostics.

use std::fmt;

use crate::errors::{FailureKind, MarketDataError};
use crate::models::ProviderId;

/// Why a provider was skipped during fetch, without a network call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Provider needs an API key and none is configured.
    MissingCredential,

    /// Provider has no coverage for this symbol's class or exchange.
    CoverageGap { symbol: String },

    /// Provider doesn't support latest quotes (for latest fetch).
    LatestNotSupported,

    /// Provider doesn't support candle history (for history fetch).
    HistoryNotSupported,

    /// Provider is listed in the priority order but not registered.
    NotRegistered,
}

impl SkipReason {
    /// Map an eligibility failure to a skip reason.
    ///
    /// Returns `None` for errors that are not eligibility checks.
    pub fn from_error(error: &MarketDataError, symbol: &str) -> Option<Self> {
        match error.kind() {
            FailureKind::Unconfigured => Some(SkipReason::MissingCredential),
            FailureKind::CoverageGap => Some(SkipReason::CoverageGap {
                symbol: symbol.to_string(),
            }),
            FailureKind::Transient => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingCredential => write!(f, "missing credential"),
            SkipReason::CoverageGap { symbol } => write!(f, "no coverage for {}", symbol),
            SkipReason::LatestNotSupported => write!(f, "latest quotes not supported"),
            SkipReason::HistoryNotSupported => write!(f, "history not supported"),
            SkipReason::NotRegistered => write!(f, "not registered"),
        }
    }
}

/// Record of a single provider attempt during a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub skipped: Option<SkipReason>,
    pub error: Option<String>,
    pub success: bool,
}

/// Detailed result of a fetch operation with skip diagnostics.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: Some(reason),
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, provider_id: ProviderId, error: String) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: None,
            error: Some(error),
            success: false,
        });
    }

    pub fn record_success(&mut self, provider_id: ProviderId) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: None,
            error: None,
            success: true,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| {
                if a.success {
                    format!("{}: SUCCESS", a.provider_id)
                } else if let Some(skip) = &a.skipped {
                    format!("{}: SKIPPED ({})", a.provider_id, skip)
                } else if let Some(err) = &a.error {
                    format!("{}: ERROR ({})", a.provider_id, err)
                } else {
                    format!("{}: UNKNOWN", a.provider_id)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any provider succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }

    /// Get all skip reasons.
    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.skipped.as_ref().map(|s| (&a.provider_id, s)))
            .collect()
    }

    /// Get all errors.
    pub fn errors(&self) -> Vec<(&ProviderId, &str)> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_ref().map(|e| (&a.provider_id, e.as_str())))
            .collect()
    }
}
