use serde::Serialize;

use super::domain::{BuildingCategory, ConditionGrade};

/// Hard ceiling on depreciation; a structure always retains some value.
pub const MAX_DEPRECIATION_RATE: f64 = 0.85;

pub fn economic_life_years(category: BuildingCategory) -> u32 {
    match category {
        BuildingCategory::Residential => 55,
        BuildingCategory::Commercial => 40,
        BuildingCategory::Industrial => 35,
        BuildingCategory::Retail => 30,
        BuildingCategory::Office => 45,
        BuildingCategory::Other => 50,
    }
}

/// Scale applied to age-based depreciation. An ungraded structure is depreciated as average.
pub fn condition_adjustment(condition: Option<ConditionGrade>) -> f64 {
    match condition {
        Some(ConditionGrade::Excellent) => 0.8,
        Some(ConditionGrade::Good) => 0.9,
        Some(ConditionGrade::Average) | None => 1.0,
        Some(ConditionGrade::Fair) => 1.3,
        Some(ConditionGrade::Poor) => 1.6,
    }
}

pub fn effective_age(year_built: i32, current_year: i32) -> u32 {
    (current_year - year_built).max(0) as u32
}

/// Age and condition driven depreciation for one structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepreciationAssessment {
    pub effective_age: u32,
    pub economic_life_years: u32,
    pub condition_adjustment: f64,
    pub rate: f64,
}

impl DepreciationAssessment {
    /// Share of replacement cost retained (percent good).
    pub fn age_factor(&self) -> f64 {
        1.0 - self.rate
    }
}

pub fn assess(
    year_built: i32,
    current_year: i32,
    category: BuildingCategory,
    condition: Option<ConditionGrade>,
) -> DepreciationAssessment {
    let effective_age = effective_age(year_built, current_year);
    let economic_life_years = economic_life_years(category);
    let condition_adjustment = condition_adjustment(condition);

    let base = f64::from(effective_age) / f64::from(economic_life_years);
    let rate = (base * condition_adjustment).min(MAX_DEPRECIATION_RATE);

    DepreciationAssessment {
        effective_age,
        economic_life_years,
        condition_adjustment,
        rate,
    }
}

/// Depreciation rate alone, in `[0, MAX_DEPRECIATION_RATE]`.
pub fn rate(
    year_built: i32,
    current_year: i32,
    category: BuildingCategory,
    condition: Option<ConditionGrade>,
) -> f64 {
    assess(year_built, current_year, category, condition).rate
}
