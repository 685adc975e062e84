use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::batch::BatchCancellation;
use super::domain::{
    BuildingType, ComparableSale, ConditionGrade, ConstructionType, MarketData, ParcelId,
    PropertySnapshot, QualityGrade, Region, ValuationFactors,
};
use super::error::ValuationError;
use super::market::MarketDataProvider;
use super::parcels::ParcelRepository;
use super::rate_table::RateTableStore;
use super::scenario::ScenarioRequest;
use super::service::ValuationService;

/// Shared handler state: the orchestrator plus the parcel roll used by batch requests.
pub struct ValuationState<S, M, P> {
    pub service: ValuationService<S, M>,
    pub parcels: Arc<P>,
}

/// Router builder exposing valuation, batch, rate lookup and scenario endpoints.
pub fn valuation_router<S, M, P>(service: ValuationService<S, M>, parcels: Arc<P>) -> Router
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
    P: ParcelRepository + 'static,
{
    let state = Arc::new(ValuationState { service, parcels });
    Router::new()
        .route("/api/v1/valuations", post(valuate_handler::<S, M, P>))
        .route("/api/v1/valuations/batch", post(batch_handler::<S, M, P>))
        .route("/api/v1/rate-tables/lookup", get(lookup_handler::<S, M, P>))
        .route("/api/v1/scenarios", post(scenario_handler::<S, M, P>))
        .with_state(state)
}

pub fn status_for(error: &ValuationError) -> StatusCode {
    match error {
        ValuationError::NotFound { .. } | ValuationError::ParcelNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        ValuationError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ValuationError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ValuationError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        ValuationError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ValuationError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn error_response(error: &ValuationError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    (status_for(error), Json(payload)).into_response()
}

fn rejected_body(rejection: JsonRejection) -> Response {
    error_response(&ValuationError::validation("body", rejection.body_text()))
}

fn rejected_query(rejection: QueryRejection) -> Response {
    error_response(&ValuationError::validation("query", rejection.body_text()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableSaleBody {
    pub sale_price: f64,
    pub sale_date: NaiveDate,
    pub square_footage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataBody {
    pub region: String,
    pub trend_percent: f64,
    pub months_of_inventory: f64,
    #[serde(default)]
    pub comparable_sales: Vec<ComparableSaleBody>,
}

impl MarketDataBody {
    pub fn into_market_data(self) -> Result<MarketData, ValuationError> {
        Ok(MarketData {
            region: Region::parse(&self.region)?,
            trend_percent: self.trend_percent,
            months_of_inventory: self.months_of_inventory,
            comparable_sales: self
                .comparable_sales
                .into_iter()
                .map(|sale| ComparableSale {
                    sale_price: sale.sale_price,
                    sale_date: sale.sale_date,
                    area_units: sale.square_footage,
                })
                .collect(),
        })
    }
}

/// Single valuation payload as submitted by assessor tooling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequestBody {
    pub region: String,
    pub building_type: String,
    pub square_footage: f64,
    pub complexity_factor: f64,
    pub condition_factor: f64,
    pub year_built: i32,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub quality_grade: Option<String>,
    #[serde(default)]
    pub construction_type: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub market_data: Option<MarketDataBody>,
    #[serde(default)]
    pub matrix_year: Option<i32>,
}

/// Parsed form of [`ValuationRequestBody`].
pub struct ValuationCommand {
    pub snapshot: PropertySnapshot,
    pub factors: ValuationFactors,
    pub market_data: Option<MarketData>,
    pub matrix_year: Option<i32>,
}

impl ValuationRequestBody {
    pub fn into_command(self) -> Result<ValuationCommand, ValuationError> {
        let snapshot = PropertySnapshot {
            area_units: self.square_footage,
            year_built: self.year_built,
            building_type: BuildingType::parse(&self.building_type)?,
            region: Region::parse(&self.region)?,
            neighborhood: self.neighborhood,
        };
        let factors = ValuationFactors {
            quality_grade: self
                .quality_grade
                .as_deref()
                .map(str::parse::<QualityGrade>)
                .transpose()?,
            condition_grade: self
                .condition
                .as_deref()
                .map(str::parse::<ConditionGrade>)
                .transpose()?,
            complexity_factor: self.complexity_factor,
            condition_factor: self.condition_factor,
            construction_type: self
                .construction_type
                .as_deref()
                .map(str::parse::<ConstructionType>)
                .transpose()?,
        };
        let market_data = self
            .market_data
            .map(MarketDataBody::into_market_data)
            .transpose()?;
        Ok(ValuationCommand {
            snapshot,
            factors,
            market_data,
            matrix_year: self.matrix_year,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequestBody {
    pub property_ids: Vec<String>,
    #[serde(default)]
    pub market_data: Option<MarketDataBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLookupQuery {
    pub building_type: String,
    pub region: String,
    #[serde(default)]
    pub year: Option<i32>,
}

pub(crate) async fn valuate_handler<S, M, P>(
    State(state): State<Arc<ValuationState<S, M, P>>>,
    payload: Result<Json<ValuationRequestBody>, JsonRejection>,
) -> Response
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
    P: ParcelRepository + 'static,
{
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected_body(rejection),
    };
    let command = match body.into_command() {
        Ok(command) => command,
        Err(error) => return error_response(&error),
    };

    match state
        .service
        .valuate_pinned(
            &command.snapshot,
            &command.factors,
            command.market_data.as_ref(),
            command.matrix_year,
        )
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn batch_handler<S, M, P>(
    State(state): State<Arc<ValuationState<S, M, P>>>,
    payload: Result<Json<BatchRequestBody>, JsonRejection>,
) -> Response
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
    P: ParcelRepository + 'static,
{
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected_body(rejection),
    };
    let market_data = match body.market_data.map(MarketDataBody::into_market_data).transpose() {
        Ok(market_data) => market_data,
        Err(error) => return error_response(&error),
    };
    let ids = body.property_ids.into_iter().map(ParcelId).collect();

    match state
        .service
        .valuate_parcels(
            Arc::clone(&state.parcels),
            ids,
            market_data,
            &BatchCancellation::new(),
        )
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report.view())).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn lookup_handler<S, M, P>(
    State(state): State<Arc<ValuationState<S, M, P>>>,
    query: Result<Query<RateLookupQuery>, QueryRejection>,
) -> Response
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
    P: ParcelRepository + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejected_query(rejection),
    };
    let parsed = BuildingType::parse(&query.building_type)
        .and_then(|building_type| Ok((building_type, Region::parse(&query.region)?)));
    let (building_type, region) = match parsed {
        Ok(keys) => keys,
        Err(error) => return error_response(&error),
    };

    match state
        .service
        .resolve_rate(&building_type, &region, query.year)
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn scenario_handler<S, M, P>(
    State(state): State<Arc<ValuationState<S, M, P>>>,
    payload: Result<Json<ScenarioRequest>, JsonRejection>,
) -> Response
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
    P: ParcelRepository + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected_body(rejection),
    };
    match state.service.engine().scenarios(&request) {
        Ok(matrix) => (StatusCode::OK, Json(matrix)).into_response(),
        Err(error) => error_response(&error),
    }
}
