use chrono::NaiveDate;
use cost_matrix::config::ValuationConfig;
use cost_matrix::valuation::{
    BuildingType, ComparableSale, ConditionGrade, ConstructionType, FactorTables,
    InMemoryRateTableStore, MarketData, ParcelId, ParcelLookupError, ParcelRecord,
    ParcelRepository, PropertySnapshot, QualityGrade, RateTableImportError, Region,
    StaticMarketData, ValuationError, ValuationFactors,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use tracing::info;

const SAMPLE_RATE_TABLE: &str =
    include_str!("../../../crates/cost-matrix/data/benton_rate_table.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryParcelRepository {
    records: Arc<RwLock<HashMap<ParcelId, ParcelRecord>>>,
}

impl InMemoryParcelRepository {
    pub(crate) fn insert(&self, record: ParcelRecord) -> Result<(), ParcelLookupError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ParcelLookupError::Unavailable("parcel lock poisoned".to_string()))?;
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    pub(crate) fn ids(&self) -> Result<Vec<ParcelId>, ParcelLookupError> {
        let guard = self
            .records
            .read()
            .map_err(|_| ParcelLookupError::Unavailable("parcel lock poisoned".to_string()))?;
        let mut ids: Vec<ParcelId> = guard.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

impl ParcelRepository for InMemoryParcelRepository {
    fn fetch(&self, id: &ParcelId) -> Result<Option<ParcelRecord>, ParcelLookupError> {
        let guard = self
            .records
            .read()
            .map_err(|_| ParcelLookupError::Unavailable("parcel lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

/// Load the configured rate table export, falling back to the bundled Benton sample.
pub(crate) fn load_rate_tables(
    config: &ValuationConfig,
) -> Result<InMemoryRateTableStore, RateTableImportError> {
    let store = match &config.rate_table_csv {
        Some(path) => InMemoryRateTableStore::from_path(path)?,
        None => InMemoryRateTableStore::from_reader(Cursor::new(SAMPLE_RATE_TABLE))?,
    };
    info!(
        entries = store.len(),
        source = config
            .rate_table_csv
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "bundled sample".to_string()),
        "rate table loaded"
    );
    Ok(store)
}

pub(crate) fn factor_tables(config: &ValuationConfig) -> FactorTables {
    FactorTables::standard().with_unknown_region_multiplier(config.unknown_region_multiplier)
}

fn record(
    id: &str,
    building_type: &str,
    region: &str,
    area_units: f64,
    year_built: i32,
    factors: ValuationFactors,
) -> Result<ParcelRecord, ValuationError> {
    Ok(ParcelRecord {
        id: ParcelId(id.to_string()),
        snapshot: PropertySnapshot {
            area_units,
            year_built,
            building_type: BuildingType::parse(building_type)?,
            region: Region::parse(region)?,
            neighborhood: None,
        },
        factors,
    })
}

/// Demonstration roll covering each rate-table building class.
pub(crate) fn sample_parcels() -> Result<InMemoryParcelRepository, ValuationError> {
    let graded = |quality: QualityGrade, condition: ConditionGrade| ValuationFactors {
        quality_grade: Some(quality),
        condition_grade: Some(condition),
        ..ValuationFactors::default()
    };

    let mut records = vec![
        record(
            "1-0421-0001",
            "R1",
            "West Benton",
            2_150.0,
            2004,
            graded(QualityGrade::Good, ConditionGrade::Good),
        )?,
        record(
            "1-0421-0002",
            "R2",
            "Central Benton",
            4_800.0,
            1988,
            ValuationFactors {
                complexity_factor: 1.2,
                ..graded(QualityGrade::Average, ConditionGrade::Fair)
            },
        )?,
        record(
            "1-0515-0107",
            "C1",
            "South Benton",
            12_500.0,
            2015,
            ValuationFactors {
                construction_type: Some(ConstructionType::Masonry),
                ..graded(QualityGrade::Superior, ConditionGrade::Excellent)
            },
        )?,
        record(
            "1-0515-0220",
            "C4",
            "East Benton",
            38_000.0,
            1972,
            ValuationFactors {
                condition_factor: 0.85,
                construction_type: Some(ConstructionType::SteelFrame),
                ..graded(QualityGrade::Fair, ConditionGrade::Poor)
            },
        )?,
        record(
            "1-0630-0043",
            "I1",
            "North Benton",
            22_000.0,
            1999,
            graded(QualityGrade::Average, ConditionGrade::Average),
        )?,
    ];
    records[0].snapshot.neighborhood = Some("Badger Mountain".to_string());

    let repository = InMemoryParcelRepository::default();
    for parcel in records {
        repository
            .insert(parcel)
            .map_err(|err| ValuationError::Computation(err.to_string()))?;
    }
    Ok(repository)
}

/// Regional market snapshots used when requests carry no market data.
pub(crate) fn sample_market() -> Result<StaticMarketData, ValuationError> {
    let sale = |date: (i32, u32, u32), sale_price: f64, area_units: f64| {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .map(|sale_date| ComparableSale {
                sale_price,
                sale_date,
                area_units,
            })
            .ok_or_else(|| ValuationError::validation("sale_date", "invalid calendar date"))
    };

    Ok(StaticMarketData::new([
        MarketData {
            region: Region::parse("West Benton")?,
            trend_percent: 4.5,
            months_of_inventory: 2.1,
            comparable_sales: vec![
                sale((2026, 2, 14), 512_000.0, 2_200.0)?,
                sale((2026, 3, 2), 489_500.0, 2_050.0)?,
                sale((2026, 4, 20), 530_000.0, 2_300.0)?,
                sale((2025, 11, 8), 468_000.0, 2_000.0)?,
                sale((2025, 9, 30), 455_000.0, 1_950.0)?,
            ],
        },
        MarketData {
            region: Region::parse("Central Benton")?,
            trend_percent: 2.0,
            months_of_inventory: 5.5,
            comparable_sales: vec![
                sale((2026, 1, 22), 720_000.0, 4_600.0)?,
                sale((2025, 12, 5), 695_000.0, 4_400.0)?,
            ],
        },
        MarketData {
            region: Region::parse("East Benton")?,
            trend_percent: -1.5,
            months_of_inventory: 10.5,
            comparable_sales: Vec::new(),
        },
    ]))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
