use serde::Serialize;

use super::error::ValuationError;

/// Numeric inputs to the cost formula, already resolved and validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostInputs {
    pub area_units: f64,
    pub base_rate: f64,
    pub quality_multiplier: f64,
    pub condition_factor: f64,
    pub complexity_factor: f64,
    pub regional_multiplier: f64,
    /// Reported in the breakdown only; never part of the chained product.
    pub construction_multiplier: Option<f64>,
    pub depreciation_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostComponent {
    BaseCost,
    Complexity,
    Condition,
    Regional,
    Quality,
    Construction,
    Depreciation,
}

impl CostComponent {
    pub fn label(self) -> &'static str {
        match self {
            CostComponent::BaseCost => "Base cost",
            CostComponent::Complexity => "Complexity adjustment",
            CostComponent::Condition => "Condition adjustment",
            CostComponent::Regional => "Regional adjustment",
            CostComponent::Quality => "Quality adjustment",
            CostComponent::Construction => "Construction class",
            CostComponent::Depreciation => "Depreciation",
        }
    }
}

/// Reporting row; amounts are never summed back into the total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub component: CostComponent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostOutcome {
    pub raw_cost: f64,
    pub adjusted_cost: f64,
    pub total_cost: f64,
    pub cost_per_unit_area: f64,
    pub breakdown: Vec<BreakdownRow>,
}

pub fn compute_cost(inputs: &CostInputs) -> Result<CostOutcome, ValuationError> {
    let raw_cost = inputs.area_units * inputs.base_rate;
    let adjusted_cost = raw_cost
        * inputs.complexity_factor
        * inputs.condition_factor
        * inputs.regional_multiplier
        * inputs.quality_multiplier;
    let total_cost = adjusted_cost * (1.0 - inputs.depreciation_rate);
    let cost_per_unit_area = total_cost / inputs.area_units;

    if !total_cost.is_finite() || !cost_per_unit_area.is_finite() || total_cost < 0.0 {
        return Err(ValuationError::Computation(format!(
            "cost formula produced {total_cost} for inputs {inputs:?}"
        )));
    }

    Ok(CostOutcome {
        raw_cost,
        adjusted_cost,
        total_cost,
        cost_per_unit_area,
        breakdown: breakdown(inputs, raw_cost, adjusted_cost),
    })
}

fn breakdown(inputs: &CostInputs, raw_cost: f64, adjusted_cost: f64) -> Vec<BreakdownRow> {
    let factors = [
        (CostComponent::Complexity, inputs.complexity_factor),
        (CostComponent::Condition, inputs.condition_factor),
        (CostComponent::Regional, inputs.regional_multiplier),
        (CostComponent::Quality, inputs.quality_multiplier),
    ];

    let mut rows = Vec::with_capacity(factors.len() + 3);
    rows.push(BreakdownRow {
        component: CostComponent::BaseCost,
        factor: None,
        amount: raw_cost,
    });

    let mut stage = raw_cost;
    for (component, factor) in factors {
        rows.push(BreakdownRow {
            component,
            factor: Some(factor),
            amount: stage * (factor - 1.0),
        });
        stage *= factor;
    }

    if let Some(multiplier) = inputs.construction_multiplier {
        rows.push(BreakdownRow {
            component: CostComponent::Construction,
            factor: Some(multiplier),
            amount: 0.0,
        });
    }

    rows.push(BreakdownRow {
        component: CostComponent::Depreciation,
        factor: Some(inputs.depreciation_rate),
        amount: -(adjusted_cost * inputs.depreciation_rate),
    });

    rows
}
