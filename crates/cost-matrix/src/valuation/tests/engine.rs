use super::common::*;

use crate::valuation::cost::CostComponent;
use crate::valuation::depreciation::MAX_DEPRECIATION_RATE;
use crate::valuation::domain::{
    ConditionGrade, ConstructionType, PropertySnapshot, QualityGrade, Region, ValuationFactors,
};
use crate::valuation::error::ValuationError;
use crate::valuation::factors::FactorTables;
use crate::valuation::market;

#[test]
fn reference_parcel_total_is_the_exact_chained_product() {
    let result = engine()
        .valuate(&snapshot(), &factors(), &current_entry(), None)
        .expect("valuates");

    let expected: f64 = 2400.0 * 120.50 * 1.0 * 1.0 * 1.05 * 1.15;
    assert_eq!(result.total_cost().to_bits(), expected.to_bits());
    assert_eq!(result.cost_per_unit_area(), expected / 2400.0);
    assert_eq!(result.depreciation_rate(), 0.0);
    assert_eq!(result.age_factor(), 1.0);
    assert_eq!(result.market_adjustment(), 1.0);
    assert_eq!(result.market_value(), result.total_cost());
    assert_eq!(result.matrix_year_used(), 2025);
    assert_eq!(result.base_rate(), 120.50);
    assert!(!result.market_data_applied());
}

#[test]
fn repeated_valuations_are_identical() {
    let engine = engine();
    let market = market_data();
    let first = engine
        .valuate(&snapshot(), &factors(), &current_entry(), Some(&market))
        .expect("valuates");
    let second = engine
        .valuate(&snapshot(), &factors(), &current_entry(), Some(&market))
        .expect("valuates");
    assert_eq!(first, second);
    assert_eq!(first.total_cost().to_bits(), second.total_cost().to_bits());
}

#[test]
fn total_cost_rises_with_quality_grade() {
    let engine = engine();
    let totals: Vec<f64> = QualityGrade::ALL
        .iter()
        .map(|grade| {
            let graded = ValuationFactors {
                quality_grade: Some(*grade),
                ..factors()
            };
            engine
                .valuate(&snapshot(), &graded, &current_entry(), None)
                .expect("valuates")
                .total_cost()
        })
        .collect();
    assert!(totals.windows(2).all(|pair| pair[0] < pair[1]), "{totals:?}");
}

#[test]
fn older_structures_never_cost_more() {
    let engine = engine();
    let mut previous = f64::INFINITY;
    for year_built in (1900..=CURRENT_YEAR).rev() {
        let aged = PropertySnapshot {
            year_built,
            ..snapshot()
        };
        let result = engine
            .valuate(&aged, &factors(), &current_entry(), None)
            .expect("valuates");
        assert!(result.depreciation_rate() <= MAX_DEPRECIATION_RATE);
        assert!(result.total_cost() <= previous, "year {year_built}");
        previous = result.total_cost();
    }
}

#[test]
fn depreciation_is_capped_for_very_old_poor_structures() {
    let aged = PropertySnapshot {
        year_built: 1900,
        ..snapshot()
    };
    let poor = ValuationFactors {
        condition_grade: Some(ConditionGrade::Poor),
        ..factors()
    };
    let result = engine()
        .valuate(&aged, &poor, &current_entry(), None)
        .expect("valuates");
    assert_eq!(result.depreciation_rate(), MAX_DEPRECIATION_RATE);
    assert_eq!(result.effective_age(), 126);
    assert_eq!(result.applied_factors().condition_adjustment, 1.6);
    assert_eq!(result.applied_factors().economic_life_years, 55);
}

#[test]
fn confidence_stays_within_unit_interval() {
    let engine = engine();
    let market = market_data();
    for year_built in [1900, 1950, 2000, 2020, CURRENT_YEAR] {
        for market_data in [None, Some(&market)] {
            let aged = PropertySnapshot {
                year_built,
                ..snapshot()
            };
            let score = engine
                .valuate(&aged, &factors(), &current_entry(), market_data)
                .expect("valuates")
                .confidence_score();
            assert!((0.0..=1.0).contains(&score), "score {score}");
        }
    }
}

#[test]
fn matching_market_data_adjusts_value_and_confidence() {
    let market = market_data();
    let result = engine()
        .valuate(&snapshot(), &factors(), &current_entry(), Some(&market))
        .expect("valuates");

    let adjustment = market::market_adjustment(4.0, 2.5);
    assert!(result.market_data_applied());
    assert_eq!(result.market_adjustment(), adjustment);
    assert_eq!(result.market_value(), result.total_cost() * adjustment);
    assert_eq!(result.confidence_score(), 1.0);
    assert_eq!(result.comparable_price_per_unit(), Some(310_000.0 / 2100.0));
}

#[test]
fn market_data_for_another_region_is_ignored() {
    let mut elsewhere = market_data();
    elsewhere.region = Region::parse("Western").expect("valid");
    let result = engine()
        .valuate(&snapshot(), &factors(), &current_entry(), Some(&elsewhere))
        .expect("valuates");
    assert!(!result.market_data_applied());
    assert_eq!(result.market_adjustment(), 1.0);
    assert_eq!(result.comparable_price_per_unit(), None);
    // 5/8 completeness, no comparables, new construction.
    assert!((result.confidence_score() - (0.5 + 0.3 * 0.625 + 0.1)).abs() < 1e-12);
}

#[test]
fn out_of_range_complexity_is_rejected() {
    for complexity_factor in [0.49, 3.01, f64::NAN] {
        let factors = ValuationFactors {
            complexity_factor,
            ..factors()
        };
        let err = engine()
            .valuate(&snapshot(), &factors, &current_entry(), None)
            .expect_err("rejected");
        assert!(matches!(
            err,
            ValuationError::Validation { field: "complexity_factor", .. }
        ));
    }
}

#[test]
fn entry_for_another_pair_is_rejected() {
    let err = engine()
        .valuate(
            &snapshot(),
            &factors(),
            &rate_entry("C1", "Central Benton", 2025, 142.25),
            None,
        )
        .expect_err("mismatched entry");
    assert!(matches!(
        err,
        ValuationError::Validation { field: "rate_table_entry", .. }
    ));
}

#[test]
fn construction_type_is_echoed_without_changing_the_total() {
    let concrete = ValuationFactors {
        construction_type: Some(ConstructionType::Concrete),
        ..factors()
    };
    let result = engine()
        .valuate(&snapshot(), &concrete, &current_entry(), None)
        .expect("valuates");
    let expected: f64 = 2400.0 * 120.50 * 1.0 * 1.0 * 1.05 * 1.15;
    assert_eq!(result.total_cost().to_bits(), expected.to_bits());
    assert_eq!(result.applied_factors().construction_multiplier, Some(1.4));
    assert!(result
        .breakdown()
        .iter()
        .any(|row| row.component == CostComponent::Construction));
}

#[test]
fn unknown_region_needs_the_configured_fallback() {
    let yakima = PropertySnapshot {
        region: Region::parse("Yakima").expect("valid"),
        ..snapshot()
    };
    let entry = rate_entry("ResidentialR1", "Yakima", 2025, 118.0);

    let strict = engine().valuate(&yakima, &factors(), &entry, None);
    assert!(matches!(
        strict,
        Err(ValuationError::Validation { field: "region", .. })
    ));

    let lenient = engine_with(FactorTables::standard().with_unknown_region_multiplier(Some(1.0)))
        .valuate(&yakima, &factors(), &entry, None)
        .expect("fallback applies");
    assert!(lenient.applied_factors().regional_fallback);
    assert_eq!(lenient.applied_factors().regional_multiplier, 1.0);
}

#[test]
fn absent_grades_apply_no_adjustment() {
    let ungraded = ValuationFactors::default();
    let result = engine()
        .valuate(&snapshot(), &ungraded, &current_entry(), None)
        .expect("valuates");
    assert_eq!(result.applied_factors().quality_multiplier, 1.0);
    assert_eq!(result.applied_factors().condition_adjustment, 1.0);
    assert_eq!(result.total_cost(), 2400.0 * 120.50 * 1.0 * 1.0 * 1.05 * 1.0);
}

#[test]
fn year_built_after_the_valuation_year_is_rejected() {
    let future = PropertySnapshot {
        year_built: CURRENT_YEAR + 1,
        ..snapshot()
    };
    assert!(matches!(
        engine().valuate(&future, &factors(), &current_entry(), None),
        Err(ValuationError::Validation { field: "year_built", .. })
    ));
}
