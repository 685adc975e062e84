use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::domain::{MarketData, PropertySnapshot, Region, ValuationFactors};

/// Sales within this many days before the valuation date count as recent.
pub const RECENT_SALE_WINDOW_DAYS: i64 = 180;

const CONFIDENCE_BASE: f64 = 0.5;
const COMPLETENESS_WEIGHT: f64 = 0.3;
const COMPARABLES_BONUS: f64 = 0.2;
const COMPARABLES_THRESHOLD: usize = 5;
const RECENT_SALES_BONUS: f64 = 0.15;
const RECENT_SALES_THRESHOLD: usize = 3;
const VALUATION_FIELD_COUNT: u32 = 8;

pub fn supply_demand_factor(months_of_inventory: f64) -> f64 {
    if months_of_inventory < 3.0 {
        1.05
    } else if months_of_inventory > 9.0 {
        0.95
    } else {
        1.0
    }
}

pub fn market_adjustment(trend_percent: f64, months_of_inventory: f64) -> f64 {
    (1.0 + trend_percent / 100.0) * supply_demand_factor(months_of_inventory)
}

/// Evidence feeding the confidence heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub completeness: f64,
    pub comparable_count: usize,
    pub recent_sales_count: usize,
    pub effective_age: u32,
}

pub fn confidence_score(inputs: &ConfidenceInputs) -> f64 {
    let mut score = CONFIDENCE_BASE + COMPLETENESS_WEIGHT * inputs.completeness.clamp(0.0, 1.0);

    if inputs.comparable_count >= COMPARABLES_THRESHOLD {
        score += COMPARABLES_BONUS;
    }
    if inputs.recent_sales_count >= RECENT_SALES_THRESHOLD {
        score += RECENT_SALES_BONUS;
    }
    if inputs.effective_age < 10 {
        score += 0.1;
    } else if inputs.effective_age < 25 {
        score += 0.05;
    }

    score.clamp(0.0, 1.0)
}

/// Fraction of the eight valuation fields supplied for this parcel.
pub fn data_completeness(snapshot: &PropertySnapshot, factors: &ValuationFactors) -> f64 {
    // Area, year built, building type and region are mandatory on the snapshot.
    let mut present: u32 = 4;
    if snapshot.has_neighborhood() {
        present += 1;
    }
    if factors.quality_grade.is_some() {
        present += 1;
    }
    if factors.condition_grade.is_some() {
        present += 1;
    }
    if factors.construction_type.is_some() {
        present += 1;
    }
    f64::from(present) / f64::from(VALUATION_FIELD_COUNT)
}

pub fn recent_sales_count(market: &MarketData, as_of: NaiveDate) -> usize {
    market
        .comparable_sales
        .iter()
        .filter(|sale| {
            let age_days = (as_of - sale.sale_date).num_days();
            (0..=RECENT_SALE_WINDOW_DAYS).contains(&age_days)
        })
        .count()
}

/// Median comparable sale price per unit area.
pub fn median_price_per_unit_area(market: &MarketData) -> Option<f64> {
    let mut prices: Vec<f64> = market
        .comparable_sales
        .iter()
        .map(|sale| sale.price_per_unit_area())
        .collect();
    if prices.is_empty() {
        return None;
    }
    prices.sort_by(f64::total_cmp);
    let mid = prices.len() / 2;
    if prices.len() % 2 == 0 {
        Some((prices[mid - 1] + prices[mid]) / 2.0)
    } else {
        Some(prices[mid])
    }
}

/// Source of market conditions consulted when a request carries none.
pub trait MarketDataProvider: Send + Sync {
    fn market_data(&self, region: &Region) -> Result<Option<MarketData>, ProviderError>;
}

/// Error returned by market data providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("market data unavailable: {0}")]
    Unavailable(String),
}

/// Provider for deployments without a market feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMarketData;

impl MarketDataProvider for NoMarketData {
    fn market_data(&self, _region: &Region) -> Result<Option<MarketData>, ProviderError> {
        Ok(None)
    }
}

/// Fixed per-region market snapshots.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    by_region: BTreeMap<String, MarketData>,
}

impl StaticMarketData {
    pub fn new(snapshots: impl IntoIterator<Item = MarketData>) -> Self {
        Self {
            by_region: snapshots
                .into_iter()
                .map(|market| (market.region.key(), market))
                .collect(),
        }
    }
}

impl MarketDataProvider for StaticMarketData {
    fn market_data(&self, region: &Region) -> Result<Option<MarketData>, ProviderError> {
        Ok(self.by_region.get(&region.key()).cloned())
    }
}
