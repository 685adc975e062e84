use std::collections::BTreeMap;

use tracing::debug;

use super::domain::{normalize_key, ConstructionType, QualityGrade, Region};
use super::error::ValuationError;

/// Immutable multiplier tables injected into the [`FactorResolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTables {
    quality: BTreeMap<QualityGrade, f64>,
    construction: BTreeMap<ConstructionType, f64>,
    regional: BTreeMap<String, (String, f64)>,
    unknown_region_multiplier: Option<f64>,
}

impl FactorTables {
    pub fn new(
        quality: impl IntoIterator<Item = (QualityGrade, f64)>,
        construction: impl IntoIterator<Item = (ConstructionType, f64)>,
        regional: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            quality: quality.into_iter().collect(),
            construction: construction.into_iter().collect(),
            regional: regional
                .into_iter()
                .map(|(name, multiplier)| (normalize_key(&name), (name, multiplier)))
                .collect(),
            unknown_region_multiplier: None,
        }
    }

    /// Benton County reference tables.
    pub fn standard() -> Self {
        Self::new(
            [
                (QualityGrade::Premium, 1.60),
                (QualityGrade::Superior, 1.35),
                (QualityGrade::Good, 1.15),
                (QualityGrade::Average, 1.00),
                (QualityGrade::Fair, 0.85),
                (QualityGrade::Economy, 0.65),
            ],
            [
                (ConstructionType::WoodFrame, 1.00),
                (ConstructionType::Masonry, 1.15),
                (ConstructionType::SteelFrame, 1.25),
                (ConstructionType::Concrete, 1.40),
            ],
            [
                ("North Benton", 0.95),
                ("Central Benton", 1.10),
                ("South Benton", 1.00),
                ("West Benton", 1.25),
                ("East Benton", 0.90),
                ("Northern", 0.95),
                ("Southern", 1.00),
                ("Eastern", 1.05),
                ("Western", 1.15),
                ("Central", 1.10),
            ]
            .map(|(name, multiplier)| (name.to_string(), multiplier)),
        )
    }

    /// Opt in to valuing parcels in regions missing from the table at `multiplier`.
    pub fn with_unknown_region_multiplier(mut self, multiplier: Option<f64>) -> Self {
        self.unknown_region_multiplier = multiplier;
        self
    }

    pub fn with_quality(mut self, grade: QualityGrade, multiplier: f64) -> Self {
        self.quality.insert(grade, multiplier);
        self
    }

    pub fn without_quality(mut self, grade: QualityGrade) -> Self {
        self.quality.remove(&grade);
        self
    }

    pub fn with_region(mut self, name: &str, multiplier: f64) -> Self {
        self.regional
            .insert(normalize_key(name), (name.to_string(), multiplier));
        self
    }

    pub fn regions(&self) -> impl Iterator<Item = (&str, f64)> {
        self.regional
            .values()
            .map(|(name, multiplier)| (name.as_str(), *multiplier))
    }
}

impl Default for FactorTables {
    fn default() -> Self {
        Self::standard()
    }
}

/// Regional multiplier together with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionalMultiplier {
    pub multiplier: f64,
    pub fallback: bool,
}

/// Pure lookups from qualitative inputs to numeric multipliers.
#[derive(Debug, Clone, Default)]
pub struct FactorResolver {
    tables: FactorTables,
}

impl FactorResolver {
    pub fn new(tables: FactorTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &FactorTables {
        &self.tables
    }

    pub fn quality_multiplier(&self, grade: QualityGrade) -> Result<f64, ValuationError> {
        self.tables.quality.get(&grade).copied().ok_or_else(|| {
            ValuationError::validation(
                "quality_grade",
                format!("no multiplier defined for grade {}", grade.label()),
            )
        })
    }

    pub fn construction_multiplier(
        &self,
        construction: ConstructionType,
    ) -> Result<f64, ValuationError> {
        self.tables
            .construction
            .get(&construction)
            .copied()
            .ok_or_else(|| {
                ValuationError::validation(
                    "construction_type",
                    format!("no multiplier defined for {}", construction.label()),
                )
            })
    }

    pub fn regional_multiplier(&self, region: &Region) -> Result<RegionalMultiplier, ValuationError> {
        if let Some((_, multiplier)) = self.tables.regional.get(&region.key()) {
            return Ok(RegionalMultiplier {
                multiplier: *multiplier,
                fallback: false,
            });
        }

        match self.tables.unknown_region_multiplier {
            Some(multiplier) => {
                debug!(region = %region, multiplier, "region missing from table, using configured fallback");
                Ok(RegionalMultiplier {
                    multiplier,
                    fallback: true,
                })
            }
            None => Err(ValuationError::validation(
                "region",
                format!("no regional multiplier defined for '{region}'"),
            )),
        }
    }
}
