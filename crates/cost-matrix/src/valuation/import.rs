use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{BuildingType, RateTableEntry, Region};
use super::error::ValuationError;
use super::rate_table::{InMemoryRateTableStore, RateTableEntryError};

#[derive(Debug)]
pub enum RateTableImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, source: ValuationError },
    Entry { line: u64, source: RateTableEntryError },
}

impl std::fmt::Display for RateTableImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateTableImportError::Io(err) => write!(f, "failed to read rate table file: {}", err),
            RateTableImportError::Csv(err) => write!(f, "invalid rate table CSV data: {}", err),
            RateTableImportError::InvalidRow { line, source } => {
                write!(f, "rate table row on line {} is invalid: {}", line, source)
            }
            RateTableImportError::Entry { line, source } => {
                write!(f, "rate table row on line {} rejected: {}", line, source)
            }
        }
    }
}

impl std::error::Error for RateTableImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RateTableImportError::Io(err) => Some(err),
            RateTableImportError::Csv(err) => Some(err),
            RateTableImportError::InvalidRow { source, .. } => Some(source),
            RateTableImportError::Entry { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for RateTableImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RateTableImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct RateTableRow {
    building_type: String,
    region: String,
    year: i32,
    base_cost_per_unit_area: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_active: Option<String>,
}

impl RateTableRow {
    fn into_entry(self) -> Result<RateTableEntry, ValuationError> {
        let building_type = BuildingType::parse(&self.building_type)?;
        let region = Region::parse(&self.region)?;
        let is_active = match self.is_active.as_deref() {
            None => true,
            Some(raw) => parse_flag(raw)?,
        };
        let description = self
            .description
            .unwrap_or_else(|| format!("{} / {} {}", building_type, region, self.year));

        Ok(RateTableEntry {
            building_type,
            region,
            year: self.year,
            base_cost_per_unit_area: self.base_cost_per_unit_area,
            description,
            is_active,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool, ValuationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(ValuationError::validation(
            "is_active",
            format!("'{other}' is not a boolean flag"),
        )),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

impl InMemoryRateTableStore {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RateTableImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a cost matrix export with headers
    /// `building_type,region,year,base_cost_per_unit_area[,description][,is_active]`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RateTableImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut store = Self::default();

        for record in csv_reader.deserialize::<RateTableRow>() {
            let row = record?;
            // Header occupies line 1.
            let line = store.len() as u64 + 2;
            let entry = row
                .into_entry()
                .map_err(|source| RateTableImportError::InvalidRow { line, source })?;
            store
                .insert(entry)
                .map_err(|source| RateTableImportError::Entry { line, source })?;
        }

        Ok(store)
    }
}
