//! Cost matrix valuation: rate-table resolution, factor lookup, depreciation, the cost
//! formula, market adjustment, confidence scoring and batch orchestration.
//!
//! [`ValuationEngine`] is the pure pipeline over an already-resolved rate entry.
//! [`ValuationService`] wraps it with the rate-table store and market data provider,
//! applying upstream timeouts and bounded batch fan-out.

pub mod batch;
pub mod clock;
pub mod cost;
pub mod depreciation;
pub mod domain;
pub mod engine;
pub mod error;
pub mod factors;
pub(crate) mod import;
pub mod market;
pub mod parcels;
pub mod rate_table;
pub mod result;
pub mod router;
pub mod scenario;
pub mod service;

#[cfg(test)]
mod tests;

pub use batch::{
    BatchCancellation, BatchItemOutcome, BatchSummary, BatchValuationReport,
    BatchValuationRequest,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use cost::{compute_cost, BreakdownRow, CostComponent, CostInputs, CostOutcome};
pub use depreciation::{DepreciationAssessment, MAX_DEPRECIATION_RATE};
pub use domain::{
    BuildingCategory, BuildingType, ComparableSale, ConditionGrade, ConstructionType,
    MarketData, ParcelId, PropertySnapshot, QualityGrade, RateTableEntry, Region,
    ValuationFactors,
};
pub use engine::ValuationEngine;
pub use error::{Upstream, ValuationError};
pub use factors::{FactorResolver, FactorTables, RegionalMultiplier};
pub use import::RateTableImportError;
pub use market::{
    confidence_score, market_adjustment, ConfidenceInputs, MarketDataProvider, NoMarketData,
    ProviderError, StaticMarketData,
};
pub use parcels::{ParcelLookupError, ParcelRecord, ParcelRepository};
pub use rate_table::{
    resolve_entry, InMemoryRateTableStore, RateTableEntryError, RateTableStore, StoreError,
};
pub use result::{AppliedFactors, ValuationResult};
pub use router::{status_for, valuation_router};
pub use scenario::{run_scenario_matrix, ScenarioMatrix, ScenarioRequest, ScenarioSummary};
pub use service::ValuationService;
