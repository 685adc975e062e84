use crate::infra::{factor_tables, load_rate_tables, sample_market, sample_parcels};
use clap::Args;
use cost_matrix::config::{AppConfig, ValuationConfig};
use cost_matrix::error::AppError;
use cost_matrix::valuation::{
    BatchCancellation, BuildingType, ConditionGrade, ConstructionType, NoMarketData,
    PropertySnapshot, QualityGrade, Region, ScenarioMatrix, ScenarioRequest, ValuationEngine,
    ValuationError, ValuationFactors, ValuationResult, ValuationService,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional rate table CSV export to value the sample roll against.
    #[arg(long)]
    pub(crate) rate_table_csv: Option<PathBuf>,
    /// Print the cost breakdown for every parcel.
    #[arg(long)]
    pub(crate) breakdown: bool,
    /// Skip the scenario sweep portion of the demo.
    #[arg(long)]
    pub(crate) skip_scenarios: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ValuateArgs {
    /// Rate-table building type, e.g. R1 or ResidentialR1
    #[arg(long)]
    pub(crate) building_type: String,
    /// Assessment region, e.g. West Benton
    #[arg(long)]
    pub(crate) region: String,
    /// Improvement area in square feet
    #[arg(long)]
    pub(crate) area: f64,
    #[arg(long)]
    pub(crate) year_built: i32,
    /// Quality grade name or Benton code (A+, A, B, C, D, E)
    #[arg(long)]
    pub(crate) quality: Option<String>,
    /// Observed condition (Poor, Fair, Average, Good, Excellent)
    #[arg(long)]
    pub(crate) condition: Option<String>,
    /// Structural system (Wood Frame, Masonry, Steel Frame, Concrete)
    #[arg(long)]
    pub(crate) construction: Option<String>,
    #[arg(long, default_value_t = 1.0)]
    pub(crate) complexity: f64,
    #[arg(long, default_value_t = 1.0)]
    pub(crate) condition_factor: f64,
    /// Resolve the rate table as of this year instead of the current one
    #[arg(long)]
    pub(crate) matrix_year: Option<i32>,
    /// Print the result as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

fn valuation_config(rate_table_csv: Option<PathBuf>) -> Result<ValuationConfig, AppError> {
    let mut config = AppConfig::load()?.valuation;
    if rate_table_csv.is_some() {
        config.rate_table_csv = rate_table_csv;
    }
    Ok(config)
}

pub(crate) async fn run_valuation(args: ValuateArgs) -> Result<(), AppError> {
    let config = valuation_config(None)?;
    let snapshot = PropertySnapshot {
        area_units: args.area,
        year_built: args.year_built,
        building_type: BuildingType::parse(&args.building_type)?,
        region: Region::parse(&args.region)?,
        neighborhood: None,
    };
    let factors = ValuationFactors {
        quality_grade: args
            .quality
            .as_deref()
            .map(str::parse::<QualityGrade>)
            .transpose()?,
        condition_grade: args
            .condition
            .as_deref()
            .map(str::parse::<ConditionGrade>)
            .transpose()?,
        complexity_factor: args.complexity,
        condition_factor: args.condition_factor,
        construction_type: args
            .construction
            .as_deref()
            .map(str::parse::<ConstructionType>)
            .transpose()?,
    };

    let service = ValuationService::new(
        Arc::new(load_rate_tables(&config)?),
        Arc::new(NoMarketData),
        ValuationEngine::new(factor_tables(&config)),
        config,
    );
    let result = service
        .valuate_pinned(&snapshot, &factors, None, args.matrix_year)
        .await?;

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Result payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!(
        "{} {} | {:.0} sq ft | built {}",
        snapshot.building_type, snapshot.region, snapshot.area_units, snapshot.year_built
    );
    render_result(&result, true);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        rate_table_csv,
        breakdown,
        skip_scenarios,
    } = args;

    let config = valuation_config(rate_table_csv)?;
    let store = Arc::new(load_rate_tables(&config)?);
    let parcels = Arc::new(sample_parcels()?);
    let service = ValuationService::new(
        Arc::clone(&store),
        Arc::new(sample_market()?),
        ValuationEngine::new(factor_tables(&config)),
        config,
    );

    println!("Cost matrix valuation demo");
    println!(
        "Rate table: {} entries | valuation year {}",
        store.len(),
        service.engine().current_year()
    );

    let ids = parcels
        .ids()
        .map_err(|err| ValuationError::Computation(err.to_string()))?;
    let report = service
        .valuate_parcels(Arc::clone(&parcels), ids, None, &BatchCancellation::new())
        .await?;

    println!("\nPortfolio valuation");
    for item in report.results() {
        match &item.outcome {
            Ok(result) => {
                println!("- Parcel {}", item.id);
                render_result(result, breakdown);
            }
            Err(err) => println!("- Parcel {}: {} ({})", item.id, err, err.kind()),
        }
    }

    let summary = report.summary();
    println!(
        "\nSummary: {} parcels | {} valued | {} failed | {} cancelled",
        summary.total, summary.succeeded, summary.failed, summary.cancelled
    );

    if skip_scenarios {
        return Ok(());
    }

    let request = ScenarioRequest {
        area_units: 2_150.0,
        base_rate: 150.0,
        quality_grade: None,
        condition_factor: 1.0,
        complexity_factors: vec![0.9, 1.0, 1.2],
        regional_multipliers: vec![0.95, 1.0, 1.25],
        depreciation_rates: vec![0.0, 0.2, 0.4],
    };
    match service.engine().scenarios(&request) {
        Ok(matrix) => render_scenarios(&matrix),
        Err(err) => println!("\nScenario sweep unavailable: {err}"),
    }

    Ok(())
}

fn render_result(result: &ValuationResult, breakdown: bool) {
    let factors = result.applied_factors();
    println!(
        "  Base rate {:.2}/sq ft ({} matrix) | total cost {:.2} | {:.2}/sq ft",
        result.base_rate(),
        result.matrix_year_used(),
        result.total_cost(),
        result.cost_per_unit_area()
    );
    println!(
        "  Quality x{:.2} | regional x{:.2}{} | depreciation {:.1}% over {} of {} years",
        factors.quality_multiplier,
        factors.regional_multiplier,
        if factors.regional_fallback {
            " (fallback)"
        } else {
            ""
        },
        result.depreciation_rate() * 100.0,
        result.effective_age(),
        factors.economic_life_years
    );
    let market_note = if result.market_data_applied() {
        format!("market x{:.3}", result.market_adjustment())
    } else {
        "no market data".to_string()
    };
    println!(
        "  Market value {:.2} ({}) | confidence {:.0}%",
        result.market_value(),
        market_note,
        result.confidence_score() * 100.0
    );
    if let Some(comparable) = result.comparable_price_per_unit() {
        println!("  Median comparable sale {:.2}/sq ft", comparable);
    }

    if breakdown {
        for row in result.breakdown() {
            match row.factor {
                Some(factor) => println!(
                    "    - {}: {:.2} (x{:.3})",
                    row.component.label(),
                    row.amount,
                    factor
                ),
                None => println!("    - {}: {:.2}", row.component.label(), row.amount),
            }
        }
    }
}

fn render_scenarios(matrix: &ScenarioMatrix) {
    println!("\nScenario sweep ({} scenarios)", matrix.scenarios.len());
    for scenario in &matrix.scenarios {
        println!(
            "  #{:>2} complexity {:.2} | regional {:.2} | depreciation {:.0}% -> {:.2}",
            scenario.id,
            scenario.complexity_factor,
            scenario.regional_multiplier,
            scenario.depreciation_rate * 100.0,
            scenario.total_cost
        );
    }
    println!(
        "Range {:.2} to {:.2} | mean {:.2} | spread {:.2}",
        matrix.summary.min, matrix.summary.max, matrix.summary.mean, matrix.summary.spread
    );
}
