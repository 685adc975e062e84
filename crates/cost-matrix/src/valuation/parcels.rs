use serde::{Deserialize, Serialize};

use super::domain::{ParcelId, PropertySnapshot, ValuationFactors};

/// Parcel as held by the assessment roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub id: ParcelId,
    pub snapshot: PropertySnapshot,
    pub factors: ValuationFactors,
}

/// Read-only lookup used by portfolio valuations keyed by parcel id.
pub trait ParcelRepository: Send + Sync {
    fn fetch(&self, id: &ParcelId) -> Result<Option<ParcelRecord>, ParcelLookupError>;
}

/// Error raised by parcel repositories.
#[derive(Debug, thiserror::Error)]
pub enum ParcelLookupError {
    #[error("parcel repository unavailable: {0}")]
    Unavailable(String),
}
