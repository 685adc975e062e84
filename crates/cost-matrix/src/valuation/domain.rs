use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ValuationError;

/// Accepted range for the complexity factor.
pub const COMPLEXITY_FACTOR_RANGE: RangeInclusive<f64> = 0.5..=3.0;
/// Accepted range for the numeric condition factor applied to cost.
pub const CONDITION_FACTOR_RANGE: RangeInclusive<f64> = 0.6..=1.1;
/// Oldest construction year a snapshot may carry.
pub const EARLIEST_YEAR_BUILT: i32 = 1900;

/// Lowercase alphanumeric form used to compare codes and names.
pub(crate) fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Identifier wrapper for parcels in a batch or repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParcelId(pub String);

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rate-table building type, either a descriptive name (`ResidentialR1`) or a Benton code (`R1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildingType(String);

impl BuildingType {
    pub fn parse(raw: &str) -> Result<Self, ValuationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValuationError::validation(
                "building_type",
                "must not be blank",
            ));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        {
            return Err(ValuationError::validation(
                "building_type",
                format!("'{trimmed}' contains unsupported characters"),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &BuildingType) -> bool {
        normalize_key(&self.0) == normalize_key(&other.0)
    }

    /// Derive the category that drives economic life.
    pub fn category(&self) -> BuildingCategory {
        let key = normalize_key(&self.0);
        for (prefix, category) in [
            ("residential", BuildingCategory::Residential),
            ("commercial", BuildingCategory::Commercial),
            ("industrial", BuildingCategory::Industrial),
            ("retail", BuildingCategory::Retail),
            ("office", BuildingCategory::Office),
        ] {
            if key.starts_with(prefix) {
                return category;
            }
        }

        let mut chars = key.chars();
        let Some(letter) = chars.next() else {
            return BuildingCategory::Other;
        };
        let digits: String = chars.collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return BuildingCategory::Other;
        }

        match (letter, digits.as_str()) {
            ('r', _) => BuildingCategory::Residential,
            ('c', "1") => BuildingCategory::Retail,
            ('c', "2") => BuildingCategory::Office,
            ('c', _) => BuildingCategory::Commercial,
            ('i', _) => BuildingCategory::Industrial,
            _ => BuildingCategory::Other,
        }
    }
}

impl FromStr for BuildingType {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BuildingType {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BuildingType> for String {
    fn from(value: BuildingType) -> Self {
        value.0
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad use class used for economic-life lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Residential,
    Commercial,
    Industrial,
    Retail,
    Office,
    Other,
}

/// Assessment region or sub-region name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    pub fn parse(raw: &str) -> Result<Self, ValuationError> {
        let trimmed = raw.trim();
        if normalize_key(trimmed).is_empty() {
            return Err(ValuationError::validation("region", "must not be blank"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValuationError::validation(
                "region",
                "contains control characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn key(&self) -> String {
        normalize_key(&self.0)
    }

    pub fn matches(&self, other: &Region) -> bool {
        self.key() == other.key()
    }
}

impl FromStr for Region {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Region {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Region> for String {
    fn from(value: Region) -> Self {
        value.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Construction quality tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum QualityGrade {
    Economy,
    Fair,
    Average,
    Good,
    Superior,
    Premium,
}

impl QualityGrade {
    pub const ALL: [QualityGrade; 6] = [
        QualityGrade::Economy,
        QualityGrade::Fair,
        QualityGrade::Average,
        QualityGrade::Good,
        QualityGrade::Superior,
        QualityGrade::Premium,
    ];

    pub fn code(self) -> &'static str {
        match self {
            QualityGrade::Premium => "A+",
            QualityGrade::Superior => "A",
            QualityGrade::Good => "B",
            QualityGrade::Average => "C",
            QualityGrade::Fair => "D",
            QualityGrade::Economy => "E",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityGrade::Premium => "Premium",
            QualityGrade::Superior => "Superior",
            QualityGrade::Good => "Good",
            QualityGrade::Average => "Average",
            QualityGrade::Fair => "Fair",
            QualityGrade::Economy => "Economy",
        }
    }
}

impl FromStr for QualityGrade {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let by_code = match trimmed.to_ascii_uppercase().as_str() {
            "A+" => Some(QualityGrade::Premium),
            "A" => Some(QualityGrade::Superior),
            "B" => Some(QualityGrade::Good),
            "C" => Some(QualityGrade::Average),
            "D" => Some(QualityGrade::Fair),
            "E" => Some(QualityGrade::Economy),
            _ => None,
        };
        if let Some(grade) = by_code {
            return Ok(grade);
        }

        match normalize_key(trimmed).as_str() {
            "premium" => Ok(QualityGrade::Premium),
            "superior" => Ok(QualityGrade::Superior),
            "good" => Ok(QualityGrade::Good),
            "average" => Ok(QualityGrade::Average),
            "fair" => Ok(QualityGrade::Fair),
            "economy" => Ok(QualityGrade::Economy),
            _ => Err(ValuationError::validation(
                "quality_grade",
                format!("unknown grade '{trimmed}'"),
            )),
        }
    }
}

impl TryFrom<String> for QualityGrade {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Observed physical condition, used to scale depreciation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ConditionGrade {
    Poor,
    Fair,
    Average,
    Good,
    Excellent,
}

impl ConditionGrade {
    pub fn label(self) -> &'static str {
        match self {
            ConditionGrade::Poor => "Poor",
            ConditionGrade::Fair => "Fair",
            ConditionGrade::Average => "Average",
            ConditionGrade::Good => "Good",
            ConditionGrade::Excellent => "Excellent",
        }
    }
}

impl FromStr for ConditionGrade {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "poor" => Ok(ConditionGrade::Poor),
            "fair" => Ok(ConditionGrade::Fair),
            "average" => Ok(ConditionGrade::Average),
            "good" => Ok(ConditionGrade::Good),
            "excellent" => Ok(ConditionGrade::Excellent),
            _ => Err(ValuationError::validation(
                "condition_grade",
                format!("unknown grade '{}'", s.trim()),
            )),
        }
    }
}

impl TryFrom<String> for ConditionGrade {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Structural system of the improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ConstructionType {
    WoodFrame,
    Masonry,
    SteelFrame,
    Concrete,
}

impl ConstructionType {
    pub fn label(self) -> &'static str {
        match self {
            ConstructionType::WoodFrame => "Wood Frame",
            ConstructionType::Masonry => "Masonry",
            ConstructionType::SteelFrame => "Steel Frame",
            ConstructionType::Concrete => "Concrete",
        }
    }
}

impl FromStr for ConstructionType {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "woodframe" | "wood" => Ok(ConstructionType::WoodFrame),
            "masonry" => Ok(ConstructionType::Masonry),
            "steelframe" | "steel" => Ok(ConstructionType::SteelFrame),
            "concrete" => Ok(ConstructionType::Concrete),
            _ => Err(ValuationError::validation(
                "construction_type",
                format!("unknown construction type '{}'", s.trim()),
            )),
        }
    }
}

impl TryFrom<String> for ConstructionType {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One version of the base rate for a (building type, region) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTableEntry {
    pub building_type: BuildingType,
    pub region: Region,
    pub year: i32,
    pub base_cost_per_unit_area: f64,
    pub description: String,
    pub is_active: bool,
}

/// Immutable description of the parcel improvement being valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub area_units: f64,
    pub year_built: i32,
    pub building_type: BuildingType,
    pub region: Region,
    #[serde(default)]
    pub neighborhood: Option<String>,
}

impl PropertySnapshot {
    pub fn validate(&self, current_year: i32) -> Result<(), ValuationError> {
        if !self.area_units.is_finite() || self.area_units <= 0.0 {
            return Err(ValuationError::validation(
                "area_units",
                format!("must be a positive number, got {}", self.area_units),
            ));
        }
        if self.year_built < EARLIEST_YEAR_BUILT || self.year_built > current_year {
            return Err(ValuationError::validation(
                "year_built",
                format!(
                    "{} is outside {}..={}",
                    self.year_built, EARLIEST_YEAR_BUILT, current_year
                ),
            ));
        }
        Ok(())
    }

    pub fn has_neighborhood(&self) -> bool {
        self.neighborhood
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Qualitative grades and numeric factors supplied with a valuation request.
///
/// Absent grades mean "no adjustment" for that dimension and lower data completeness. Their
/// string forms are validated when parsed, so an unknown grade never reaches this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationFactors {
    #[serde(default)]
    pub quality_grade: Option<QualityGrade>,
    #[serde(default)]
    pub condition_grade: Option<ConditionGrade>,
    pub complexity_factor: f64,
    pub condition_factor: f64,
    #[serde(default)]
    pub construction_type: Option<ConstructionType>,
}

impl ValuationFactors {
    pub fn validate(&self) -> Result<(), ValuationError> {
        if !COMPLEXITY_FACTOR_RANGE.contains(&self.complexity_factor) {
            return Err(ValuationError::validation(
                "complexity_factor",
                format!(
                    "{} is outside {}..={}",
                    self.complexity_factor,
                    COMPLEXITY_FACTOR_RANGE.start(),
                    COMPLEXITY_FACTOR_RANGE.end()
                ),
            ));
        }
        if !CONDITION_FACTOR_RANGE.contains(&self.condition_factor) {
            return Err(ValuationError::validation(
                "condition_factor",
                format!(
                    "{} is outside {}..={}",
                    self.condition_factor,
                    CONDITION_FACTOR_RANGE.start(),
                    CONDITION_FACTOR_RANGE.end()
                ),
            ));
        }
        Ok(())
    }
}

impl Default for ValuationFactors {
    fn default() -> Self {
        Self {
            quality_grade: None,
            condition_grade: None,
            complexity_factor: 1.0,
            condition_factor: 1.0,
            construction_type: None,
        }
    }
}

/// Recorded sale used as comparable evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableSale {
    pub sale_price: f64,
    pub sale_date: NaiveDate,
    pub area_units: f64,
}

impl ComparableSale {
    pub fn price_per_unit_area(&self) -> f64 {
        self.sale_price / self.area_units
    }
}

/// Market conditions for a region at valuation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub region: Region,
    pub trend_percent: f64,
    pub months_of_inventory: f64,
    #[serde(default)]
    pub comparable_sales: Vec<ComparableSale>,
}

impl MarketData {
    pub fn validate(&self) -> Result<(), ValuationError> {
        if !self.trend_percent.is_finite() || self.trend_percent <= -100.0 {
            return Err(ValuationError::validation(
                "trend_percent",
                format!("{} must be finite and above -100", self.trend_percent),
            ));
        }
        if !self.months_of_inventory.is_finite() || self.months_of_inventory < 0.0 {
            return Err(ValuationError::validation(
                "months_of_inventory",
                format!("{} must be zero or greater", self.months_of_inventory),
            ));
        }
        for (index, sale) in self.comparable_sales.iter().enumerate() {
            if !sale.sale_price.is_finite() || sale.sale_price <= 0.0 {
                return Err(ValuationError::validation(
                    "comparable_sales",
                    format!("sale #{} has non-positive price {}", index + 1, sale.sale_price),
                ));
            }
            if !sale.area_units.is_finite() || sale.area_units <= 0.0 {
                return Err(ValuationError::validation(
                    "comparable_sales",
                    format!("sale #{} has non-positive area {}", index + 1, sale.area_units),
                ));
            }
        }
        Ok(())
    }
}
