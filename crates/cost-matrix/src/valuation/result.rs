use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cost::BreakdownRow;
use super::domain::{ConditionGrade, ConstructionType, QualityGrade};

/// Inputs echoed back with the multipliers they resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFactors {
    pub quality_grade: Option<QualityGrade>,
    pub quality_multiplier: f64,
    pub condition_grade: Option<ConditionGrade>,
    pub condition_adjustment: f64,
    pub complexity_factor: f64,
    pub condition_factor: f64,
    pub construction_type: Option<ConstructionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_multiplier: Option<f64>,
    pub regional_multiplier: f64,
    pub regional_fallback: bool,
    pub economic_life_years: u32,
}

/// Outcome of a single valuation. Built once by the engine and read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    pub(crate) base_rate: f64,
    pub(crate) applied_factors: AppliedFactors,
    pub(crate) effective_age: u32,
    pub(crate) age_factor: f64,
    pub(crate) depreciation_rate: f64,
    pub(crate) market_adjustment: f64,
    pub(crate) market_data_applied: bool,
    pub(crate) total_cost: f64,
    pub(crate) cost_per_unit_area: f64,
    pub(crate) market_value: f64,
    pub(crate) confidence_score: f64,
    pub(crate) matrix_year_used: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) comparable_price_per_unit: Option<f64>,
    pub(crate) breakdown: Vec<BreakdownRow>,
    pub(crate) timestamp: DateTime<Utc>,
}

impl ValuationResult {
    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    pub fn applied_factors(&self) -> &AppliedFactors {
        &self.applied_factors
    }

    pub fn effective_age(&self) -> u32 {
        self.effective_age
    }

    /// Percent good, `1 - depreciation_rate`.
    pub fn age_factor(&self) -> f64 {
        self.age_factor
    }

    pub fn depreciation_rate(&self) -> f64 {
        self.depreciation_rate
    }

    pub fn market_adjustment(&self) -> f64 {
        self.market_adjustment
    }

    pub fn market_data_applied(&self) -> bool {
        self.market_data_applied
    }

    /// Depreciated replacement cost. Market adjustment is not included.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn cost_per_unit_area(&self) -> f64 {
        self.cost_per_unit_area
    }

    pub fn market_value(&self) -> f64 {
        self.market_value
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn matrix_year_used(&self) -> i32 {
        self.matrix_year_used
    }

    /// Median comparable sale price per unit area, when comparables were supplied.
    pub fn comparable_price_per_unit(&self) -> Option<f64> {
        self.comparable_price_per_unit
    }

    pub fn breakdown(&self) -> &[BreakdownRow] {
        &self.breakdown
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
