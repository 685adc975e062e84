use std::fmt;

use serde::Serialize;

/// External collaborators the orchestrator waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    RateTableStore,
    MarketDataProvider,
    ParcelRepository,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Upstream::RateTableStore => "rate table store",
            Upstream::MarketDataProvider => "market data provider",
            Upstream::ParcelRepository => "parcel repository",
        };
        f.write_str(label)
    }
}

/// Typed failure for a single valuation. Batch runs record these per item.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("no rate table entry for building type '{building_type}' in region '{region}'")]
    NotFound {
        building_type: String,
        region: String,
    },
    #[error("parcel '{parcel_id}' not found")]
    ParcelNotFound { parcel_id: String },
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("{upstream} did not respond within {timeout_ms} ms")]
    UpstreamTimeout { upstream: Upstream, timeout_ms: u64 },
    #[error("{upstream} unavailable: {reason}")]
    Upstream { upstream: Upstream, reason: String },
    #[error("valuation invariant violated: {0}")]
    Computation(String),
    #[error("batch cancelled before this parcel was scheduled")]
    Cancelled,
}

impl ValuationError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable tag used in batch reports and HTTP payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ValuationError::NotFound { .. } => "not_found",
            ValuationError::ParcelNotFound { .. } => "parcel_not_found",
            ValuationError::Validation { .. } => "validation_error",
            ValuationError::UpstreamTimeout { .. } => "upstream_timeout",
            ValuationError::Upstream { .. } => "upstream_unavailable",
            ValuationError::Computation(_) => "computation_error",
            ValuationError::Cancelled => "cancelled",
        }
    }
}
