use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::ValuationConfig;
use crate::valuation::batch::{BatchCancellation, BatchValuationRequest};
use crate::valuation::clock::FixedClock;
use crate::valuation::domain::{
    BuildingType, ComparableSale, MarketData, ParcelId, PropertySnapshot, QualityGrade,
    RateTableEntry, Region, ValuationFactors,
};
use crate::valuation::engine::ValuationEngine;
use crate::valuation::factors::FactorTables;
use crate::valuation::market::{MarketDataProvider, ProviderError};
use crate::valuation::parcels::{ParcelLookupError, ParcelRecord, ParcelRepository};
use crate::valuation::rate_table::{InMemoryRateTableStore, RateTableStore, StoreError};
use crate::valuation::service::ValuationService;

pub(super) const CURRENT_YEAR: i32 = 2026;

pub(super) fn fixed_clock() -> Arc<FixedClock> {
    let now = Utc
        .with_ymd_and_hms(CURRENT_YEAR, 6, 30, 12, 0, 0)
        .single()
        .expect("valid timestamp");
    Arc::new(FixedClock(now))
}

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(CURRENT_YEAR, 6, 30).expect("valid date")
}

pub(super) fn engine() -> ValuationEngine {
    engine_with(FactorTables::standard())
}

pub(super) fn engine_with(tables: FactorTables) -> ValuationEngine {
    ValuationEngine::with_clock(tables, fixed_clock())
}

pub(super) fn rate_entry(building_type: &str, region: &str, year: i32, rate: f64) -> RateTableEntry {
    RateTableEntry {
        building_type: BuildingType::parse(building_type).expect("valid type"),
        region: Region::parse(region).expect("valid region"),
        year,
        base_cost_per_unit_area: rate,
        description: format!("{building_type} {region} {year}"),
        is_active: true,
    }
}

pub(super) fn rate_entries() -> Vec<RateTableEntry> {
    vec![
        rate_entry("ResidentialR1", "Eastern", 2024, 115.00),
        rate_entry("ResidentialR1", "Eastern", 2025, 120.50),
        rate_entry("C1", "Central Benton", 2025, 142.25),
        rate_entry("I1", "Western", 2025, 95.00),
    ]
}

pub(super) fn store() -> InMemoryRateTableStore {
    InMemoryRateTableStore::new(rate_entries()).expect("unique entries")
}

/// Entry the reference scenario resolves to for 2026.
pub(super) fn current_entry() -> RateTableEntry {
    rate_entry("ResidentialR1", "Eastern", 2025, 120.50)
}

pub(super) fn snapshot() -> PropertySnapshot {
    PropertySnapshot {
        area_units: 2400.0,
        year_built: CURRENT_YEAR,
        building_type: BuildingType::parse("ResidentialR1").expect("valid type"),
        region: Region::parse("Eastern").expect("valid region"),
        neighborhood: None,
    }
}

pub(super) fn factors() -> ValuationFactors {
    ValuationFactors {
        quality_grade: Some(QualityGrade::Good),
        ..ValuationFactors::default()
    }
}

pub(super) fn market_data() -> MarketData {
    let sale = |days_ago: i64, price: f64, area: f64| ComparableSale {
        sale_price: price,
        sale_date: as_of() - chrono::Duration::days(days_ago),
        area_units: area,
    };
    MarketData {
        region: Region::parse("Eastern").expect("valid region"),
        trend_percent: 4.0,
        months_of_inventory: 2.5,
        comparable_sales: vec![
            sale(10, 300_000.0, 2000.0),
            sale(45, 345_000.0, 2300.0),
            sale(90, 280_000.0, 1900.0),
            sale(200, 310_000.0, 2100.0),
            sale(400, 260_000.0, 2000.0),
        ],
    }
}

pub(super) fn valuation_config() -> ValuationConfig {
    ValuationConfig {
        upstream_timeout: Duration::from_millis(250),
        batch_parallelism: 2,
        ..ValuationConfig::default()
    }
}

pub(super) fn service_with<S, M>(store: S, market: M, config: ValuationConfig) -> ValuationService<S, M>
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
{
    ValuationService::new(Arc::new(store), Arc::new(market), engine(), config)
}

pub(super) fn batch_request(id: &str, building_type: &str) -> BatchValuationRequest {
    BatchValuationRequest {
        id: ParcelId(id.to_string()),
        snapshot: PropertySnapshot {
            building_type: BuildingType::parse(building_type).expect("valid type"),
            ..snapshot()
        },
        factors: factors(),
    }
}

/// Store that answers only after `delay`.
pub(super) struct SlowStore {
    pub(super) delay: Duration,
}

impl RateTableStore for SlowStore {
    fn version_set(
        &self,
        building_type: &BuildingType,
        region: &Region,
    ) -> Result<Vec<RateTableEntry>, StoreError> {
        std::thread::sleep(self.delay);
        store().version_set(building_type, region)
    }
}

pub(super) struct UnavailableStore;

impl RateTableStore for UnavailableStore {
    fn version_set(
        &self,
        _building_type: &BuildingType,
        _region: &Region,
    ) -> Result<Vec<RateTableEntry>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Store that trips the batch cancellation flag on its first lookup.
pub(super) struct CancellingStore {
    pub(super) token: BatchCancellation,
}

impl RateTableStore for CancellingStore {
    fn version_set(
        &self,
        building_type: &BuildingType,
        region: &Region,
    ) -> Result<Vec<RateTableEntry>, StoreError> {
        self.token.cancel();
        store().version_set(building_type, region)
    }
}

/// Store recording the highest number of overlapping lookups.
#[derive(Default)]
pub(super) struct ConcurrencyTrackingStore {
    active: AtomicUsize,
    pub(super) peak: AtomicUsize,
}

impl RateTableStore for ConcurrencyTrackingStore {
    fn version_set(
        &self,
        building_type: &BuildingType,
        region: &Region,
    ) -> Result<Vec<RateTableEntry>, StoreError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        store().version_set(building_type, region)
    }
}

pub(super) struct SlowProvider {
    pub(super) delay: Duration,
}

impl MarketDataProvider for SlowProvider {
    fn market_data(&self, _region: &Region) -> Result<Option<MarketData>, ProviderError> {
        std::thread::sleep(self.delay);
        Ok(Some(market_data()))
    }
}

pub(super) struct UnavailableProvider;

impl MarketDataProvider for UnavailableProvider {
    fn market_data(&self, _region: &Region) -> Result<Option<MarketData>, ProviderError> {
        Err(ProviderError::Unavailable("feed offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryParcels {
    records: HashMap<ParcelId, ParcelRecord>,
}

impl MemoryParcels {
    pub(super) fn with(records: impl IntoIterator<Item = ParcelRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }
}

impl ParcelRepository for MemoryParcels {
    fn fetch(&self, id: &ParcelId) -> Result<Option<ParcelRecord>, ParcelLookupError> {
        Ok(self.records.get(id).cloned())
    }
}

pub(super) fn parcel(id: &str, building_type: &str) -> ParcelRecord {
    let request = batch_request(id, building_type);
    ParcelRecord {
        id: request.id,
        snapshot: request.snapshot,
        factors: request.factors,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
