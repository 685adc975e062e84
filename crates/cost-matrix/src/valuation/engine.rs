use std::sync::Arc;

use chrono::Datelike;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::cost::{compute_cost, CostInputs};
use super::depreciation::{self, MAX_DEPRECIATION_RATE};
use super::domain::{MarketData, PropertySnapshot, RateTableEntry, ValuationFactors};
use super::error::ValuationError;
use super::factors::{FactorResolver, FactorTables};
use super::market::{self, ConfidenceInputs};
use super::result::{AppliedFactors, ValuationResult};
use super::scenario::{run_scenario_matrix, ScenarioMatrix, ScenarioRequest};

/// Pure valuation pipeline over a rate entry the caller has already resolved.
#[derive(Clone)]
pub struct ValuationEngine {
    resolver: FactorResolver,
    clock: Arc<dyn Clock>,
}

impl ValuationEngine {
    pub fn new(tables: FactorTables) -> Self {
        Self::with_clock(tables, Arc::new(SystemClock))
    }

    pub fn with_clock(tables: FactorTables, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver: FactorResolver::new(tables),
            clock,
        }
    }

    pub fn resolver(&self) -> &FactorResolver {
        &self.resolver
    }

    /// Calendar year of the valuation clock; drives effective age and rate resolution.
    pub fn current_year(&self) -> i32 {
        self.clock.now().year()
    }

    /// Boundary checks shared by the single and batch paths.
    pub fn validate(
        &self,
        snapshot: &PropertySnapshot,
        factors: &ValuationFactors,
    ) -> Result<(), ValuationError> {
        snapshot.validate(self.current_year())?;
        factors.validate()
    }

    pub fn valuate(
        &self,
        snapshot: &PropertySnapshot,
        factors: &ValuationFactors,
        entry: &RateTableEntry,
        market_data: Option<&MarketData>,
    ) -> Result<ValuationResult, ValuationError> {
        let now = self.clock.now();
        let current_year = now.year();

        snapshot.validate(current_year)?;
        factors.validate()?;
        if let Some(market_data) = market_data {
            market_data.validate()?;
        }
        check_entry(snapshot, entry)?;

        let quality_multiplier = factors
            .quality_grade
            .map(|grade| self.resolver.quality_multiplier(grade))
            .transpose()?
            .unwrap_or(1.0);
        let construction_multiplier = factors
            .construction_type
            .map(|construction| self.resolver.construction_multiplier(construction))
            .transpose()?;
        let regional = self.resolver.regional_multiplier(&snapshot.region)?;

        debug!(
            building_type = %snapshot.building_type,
            region = %snapshot.region,
            quality_multiplier,
            regional_multiplier = regional.multiplier,
            regional_fallback = regional.fallback,
            construction_multiplier = ?construction_multiplier,
            "resolved valuation factors"
        );

        let category = snapshot.building_type.category();
        let assessment = depreciation::assess(
            snapshot.year_built,
            current_year,
            category,
            factors.condition_grade,
        );
        if !(0.0..=MAX_DEPRECIATION_RATE).contains(&assessment.rate) {
            return Err(ValuationError::Computation(format!(
                "depreciation rate {} outside 0..={}",
                assessment.rate, MAX_DEPRECIATION_RATE
            )));
        }

        let outcome = compute_cost(&CostInputs {
            area_units: snapshot.area_units,
            base_rate: entry.base_cost_per_unit_area,
            quality_multiplier,
            condition_factor: factors.condition_factor,
            complexity_factor: factors.complexity_factor,
            regional_multiplier: regional.multiplier,
            construction_multiplier,
            depreciation_rate: assessment.rate,
        })?;

        let applicable = market_data.filter(|data| data.region.matches(&snapshot.region));
        if market_data.is_some() && applicable.is_none() {
            debug!(
                region = %snapshot.region,
                "market data region does not match parcel, ignoring"
            );
        }

        let market_adjustment = applicable
            .map(|data| market::market_adjustment(data.trend_percent, data.months_of_inventory))
            .unwrap_or(1.0);
        let as_of = now.date_naive();
        let confidence_score = market::confidence_score(&ConfidenceInputs {
            completeness: market::data_completeness(snapshot, factors),
            comparable_count: applicable.map_or(0, |data| data.comparable_sales.len()),
            recent_sales_count: applicable.map_or(0, |data| market::recent_sales_count(data, as_of)),
            effective_age: assessment.effective_age,
        });
        if !(0.0..=1.0).contains(&confidence_score) {
            return Err(ValuationError::Computation(format!(
                "confidence score {confidence_score} outside 0..=1"
            )));
        }

        let market_value = outcome.total_cost * market_adjustment;
        if !market_value.is_finite() {
            return Err(ValuationError::Computation(format!(
                "market value {market_value} is not finite"
            )));
        }

        Ok(ValuationResult {
            base_rate: entry.base_cost_per_unit_area,
            applied_factors: AppliedFactors {
                quality_grade: factors.quality_grade,
                quality_multiplier,
                condition_grade: factors.condition_grade,
                condition_adjustment: assessment.condition_adjustment,
                complexity_factor: factors.complexity_factor,
                condition_factor: factors.condition_factor,
                construction_type: factors.construction_type,
                construction_multiplier,
                regional_multiplier: regional.multiplier,
                regional_fallback: regional.fallback,
                economic_life_years: assessment.economic_life_years,
            },
            effective_age: assessment.effective_age,
            age_factor: assessment.age_factor(),
            depreciation_rate: assessment.rate,
            market_adjustment,
            market_data_applied: applicable.is_some(),
            total_cost: outcome.total_cost,
            cost_per_unit_area: outcome.cost_per_unit_area,
            market_value,
            confidence_score,
            matrix_year_used: entry.year,
            comparable_price_per_unit: applicable.and_then(market::median_price_per_unit_area),
            breakdown: outcome.breakdown,
            timestamp: now,
        })
    }

    /// Evaluate the cost formula over a grid of what-if parameters.
    pub fn scenarios(&self, request: &ScenarioRequest) -> Result<ScenarioMatrix, ValuationError> {
        run_scenario_matrix(request, &self.resolver)
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new(FactorTables::standard())
    }
}

fn check_entry(snapshot: &PropertySnapshot, entry: &RateTableEntry) -> Result<(), ValuationError> {
    if !entry.building_type.matches(&snapshot.building_type) || !entry.region.matches(&snapshot.region)
    {
        return Err(ValuationError::validation(
            "rate_table_entry",
            format!(
                "entry {}/{} does not apply to a {} parcel in {}",
                entry.building_type, entry.region, snapshot.building_type, snapshot.region
            ),
        ));
    }
    if !entry.base_cost_per_unit_area.is_finite() || entry.base_cost_per_unit_area <= 0.0 {
        return Err(ValuationError::Computation(format!(
            "rate table entry {}/{}/{} has non-positive base rate {}",
            entry.building_type, entry.region, entry.year, entry.base_cost_per_unit_area
        )));
    }
    Ok(())
}
