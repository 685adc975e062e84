//! Replacement-cost valuation for real-property parcels.
//!
//! The [`valuation`] module holds the engine: rate-table resolution, factor lookup,
//! depreciation, the cost formula, market adjustment and confidence scoring, and the
//! batch orchestrator. [`config`], [`telemetry`] and [`error`] carry the service plumbing
//! shared with the HTTP front end in `services/api`.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod valuation;
