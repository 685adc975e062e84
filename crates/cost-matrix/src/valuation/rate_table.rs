use std::collections::HashSet;

use tracing::debug;

use super::domain::{normalize_key, BuildingType, RateTableEntry, Region};
use super::error::ValuationError;

/// Lookup contract for versioned base-rate records.
pub trait RateTableStore: Send + Sync {
    /// Return every version held for the (building type, region) pair. An empty list means
    /// the pair is unknown to the store.
    fn version_set(
        &self,
        building_type: &BuildingType,
        region: &Region,
    ) -> Result<Vec<RateTableEntry>, StoreError>;
}

/// Error enumeration for rate-table store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rate table store unavailable: {0}")]
    Unavailable(String),
}

/// Pick the rate version for `year`: the exact year when present, otherwise the latest year at
/// or before it, otherwise the latest year on file.
pub fn resolve_entry(
    version_set: &[RateTableEntry],
    building_type: &BuildingType,
    region: &Region,
    year: i32,
) -> Result<RateTableEntry, ValuationError> {
    let candidates: Vec<&RateTableEntry> = version_set
        .iter()
        .filter(|entry| {
            entry.is_active && entry.building_type.matches(building_type) && entry.region.matches(region)
        })
        .collect();

    if candidates.is_empty() {
        return Err(ValuationError::NotFound {
            building_type: building_type.to_string(),
            region: region.to_string(),
        });
    }

    let chosen = candidates
        .iter()
        .find(|entry| entry.year == year)
        .or_else(|| {
            candidates
                .iter()
                .filter(|entry| entry.year <= year)
                .max_by_key(|entry| entry.year)
        })
        .or_else(|| candidates.iter().max_by_key(|entry| entry.year))
        .copied()
        .ok_or_else(|| ValuationError::Computation("empty candidate set".to_string()))?;

    if !chosen.base_cost_per_unit_area.is_finite() || chosen.base_cost_per_unit_area <= 0.0 {
        return Err(ValuationError::Computation(format!(
            "rate table entry {}/{}/{} has non-positive base rate {}",
            chosen.building_type, chosen.region, chosen.year, chosen.base_cost_per_unit_area
        )));
    }

    debug!(
        building_type = %building_type,
        region = %region,
        requested_year = year,
        matrix_year = chosen.year,
        candidates = candidates.len(),
        "resolved rate table version"
    );

    Ok(chosen.clone())
}

/// Reason an entry could not be added to the in-memory store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateTableEntryError {
    #[error("duplicate rate table entry for {building_type}/{region}/{year}")]
    Duplicate {
        building_type: String,
        region: String,
        year: i32,
    },
    #[error("rate table entry {building_type}/{region}/{year} must have a positive base rate")]
    NonPositiveRate {
        building_type: String,
        region: String,
        year: i32,
    },
}

/// Store backed by a vector loaded at startup; read-only once built.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateTableStore {
    entries: Vec<RateTableEntry>,
    keys: HashSet<(String, String, i32)>,
}

impl InMemoryRateTableStore {
    pub fn new(
        entries: impl IntoIterator<Item = RateTableEntry>,
    ) -> Result<Self, RateTableEntryError> {
        let mut store = Self::default();
        for entry in entries {
            store.insert(entry)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, entry: RateTableEntry) -> Result<(), RateTableEntryError> {
        if !entry.base_cost_per_unit_area.is_finite() || entry.base_cost_per_unit_area <= 0.0 {
            return Err(RateTableEntryError::NonPositiveRate {
                building_type: entry.building_type.to_string(),
                region: entry.region.to_string(),
                year: entry.year,
            });
        }

        let key = (
            normalize_key(entry.building_type.as_str()),
            entry.region.key(),
            entry.year,
        );
        if !self.keys.insert(key) {
            return Err(RateTableEntryError::Duplicate {
                building_type: entry.building_type.to_string(),
                region: entry.region.to_string(),
                year: entry.year,
            });
        }

        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RateTableEntry] {
        &self.entries
    }
}

impl RateTableStore for InMemoryRateTableStore {
    fn version_set(
        &self,
        building_type: &BuildingType,
        region: &Region,
    ) -> Result<Vec<RateTableEntry>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.building_type.matches(building_type) && entry.region.matches(region))
            .cloned()
            .collect())
    }
}
