use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::cost::{compute_cost, CostInputs};
use super::depreciation::MAX_DEPRECIATION_RATE;
use super::domain::{QualityGrade, COMPLEXITY_FACTOR_RANGE, CONDITION_FACTOR_RANGE};
use super::error::ValuationError;
use super::factors::FactorResolver;

/// Upper bound on grid size for one request.
pub const MAX_SCENARIOS: usize = 500;
const REGIONAL_MULTIPLIER_MAX: f64 = 2.0;
const DEPRECIATION_RANGE: RangeInclusive<f64> = 0.0..=MAX_DEPRECIATION_RATE;

/// Base parcel parameters plus the axes to sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    pub area_units: f64,
    pub base_rate: f64,
    #[serde(default)]
    pub quality_grade: Option<QualityGrade>,
    #[serde(default = "unit_factor")]
    pub condition_factor: f64,
    pub complexity_factors: Vec<f64>,
    pub regional_multipliers: Vec<f64>,
    pub depreciation_rates: Vec<f64>,
}

fn unit_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: usize,
    pub complexity_factor: f64,
    pub regional_multiplier: f64,
    pub depreciation_rate: f64,
    pub total_cost: f64,
    pub cost_per_unit_area: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioMatrix {
    pub scenarios: Vec<Scenario>,
    pub summary: ScenarioSummary,
}

impl ScenarioRequest {
    pub fn scenario_count(&self) -> usize {
        self.complexity_factors.len() * self.regional_multipliers.len() * self.depreciation_rates.len()
    }

    pub fn validate(&self) -> Result<(), ValuationError> {
        if !self.area_units.is_finite() || self.area_units <= 0.0 {
            return Err(ValuationError::validation(
                "area_units",
                format!("must be a positive number, got {}", self.area_units),
            ));
        }
        if !self.base_rate.is_finite() || self.base_rate <= 0.0 {
            return Err(ValuationError::validation(
                "base_rate",
                format!("must be a positive number, got {}", self.base_rate),
            ));
        }
        if !CONDITION_FACTOR_RANGE.contains(&self.condition_factor) {
            return Err(ValuationError::validation(
                "condition_factor",
                format!("{} is outside 0.6..=1.1", self.condition_factor),
            ));
        }

        check_axis("complexity_factors", &self.complexity_factors, |value| {
            COMPLEXITY_FACTOR_RANGE.contains(&value)
        })?;
        check_axis("regional_multipliers", &self.regional_multipliers, |value| {
            value > 0.0 && value <= REGIONAL_MULTIPLIER_MAX
        })?;
        check_axis("depreciation_rates", &self.depreciation_rates, |value| {
            DEPRECIATION_RANGE.contains(&value)
        })?;

        let count = self.scenario_count();
        if count > MAX_SCENARIOS {
            return Err(ValuationError::validation(
                "scenarios",
                format!("{count} scenarios requested, limit is {MAX_SCENARIOS}"),
            ));
        }
        Ok(())
    }
}

fn check_axis(
    field: &'static str,
    values: &[f64],
    in_range: impl Fn(f64) -> bool,
) -> Result<(), ValuationError> {
    if values.is_empty() {
        return Err(ValuationError::validation(field, "must contain at least one value"));
    }
    match values.iter().find(|value| !in_range(**value)) {
        Some(value) => Err(ValuationError::validation(
            field,
            format!("{value} is out of range"),
        )),
        None => Ok(()),
    }
}

/// Cartesian sweep of complexity, regional multiplier and depreciation rate.
pub fn run_scenario_matrix(
    request: &ScenarioRequest,
    resolver: &FactorResolver,
) -> Result<ScenarioMatrix, ValuationError> {
    request.validate()?;
    let quality_multiplier = request
        .quality_grade
        .map(|grade| resolver.quality_multiplier(grade))
        .transpose()?
        .unwrap_or(1.0);

    let mut scenarios = Vec::with_capacity(request.scenario_count());
    for &complexity_factor in &request.complexity_factors {
        for &regional_multiplier in &request.regional_multipliers {
            for &depreciation_rate in &request.depreciation_rates {
                let outcome = compute_cost(&CostInputs {
                    area_units: request.area_units,
                    base_rate: request.base_rate,
                    quality_multiplier,
                    condition_factor: request.condition_factor,
                    complexity_factor,
                    regional_multiplier,
                    construction_multiplier: None,
                    depreciation_rate,
                })?;
                scenarios.push(Scenario {
                    id: scenarios.len() + 1,
                    complexity_factor,
                    regional_multiplier,
                    depreciation_rate,
                    total_cost: outcome.total_cost,
                    cost_per_unit_area: outcome.cost_per_unit_area,
                });
            }
        }
    }

    let summary = summarize(&scenarios)?;
    Ok(ScenarioMatrix { scenarios, summary })
}

fn summarize(scenarios: &[Scenario]) -> Result<ScenarioSummary, ValuationError> {
    let totals = scenarios.iter().map(|scenario| scenario.total_cost);
    let min = totals.clone().fold(f64::INFINITY, f64::min);
    let max = totals.clone().fold(f64::NEG_INFINITY, f64::max);
    let count = scenarios.len();
    if count == 0 {
        return Err(ValuationError::Computation("scenario grid is empty".to_string()));
    }
    let mean = totals.sum::<f64>() / count as f64;
    Ok(ScenarioSummary {
        min,
        max,
        mean,
        spread: max - min,
    })
}
