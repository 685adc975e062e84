use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::batch::{BatchCancellation, BatchValuationReport, BatchValuationRequest};
use super::domain::{
    BuildingType, MarketData, ParcelId, PropertySnapshot, RateTableEntry, Region,
    ValuationFactors,
};
use super::engine::ValuationEngine;
use super::error::{Upstream, ValuationError};
use super::market::MarketDataProvider;
use super::parcels::ParcelRepository;
use super::rate_table::{resolve_entry, RateTableStore};
use super::result::ValuationResult;
use crate::config::ValuationConfig;

/// Orchestrator composing the rate-table store, market data provider and pure engine.
pub struct ValuationService<S, M> {
    store: Arc<S>,
    market: Arc<M>,
    engine: Arc<ValuationEngine>,
    config: ValuationConfig,
}

impl<S, M> Clone for ValuationService<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            market: Arc::clone(&self.market),
            engine: Arc::clone(&self.engine),
            config: self.config.clone(),
        }
    }
}

enum Slot {
    Running(JoinHandle<Result<ValuationResult, ValuationError>>),
    Skipped,
}

impl<S, M> ValuationService<S, M>
where
    S: RateTableStore + 'static,
    M: MarketDataProvider + 'static,
{
    pub fn new(
        store: Arc<S>,
        market: Arc<M>,
        engine: ValuationEngine,
        config: ValuationConfig,
    ) -> Self {
        Self {
            store,
            market,
            engine: Arc::new(engine),
            config,
        }
    }

    pub fn engine(&self) -> &ValuationEngine {
        &self.engine
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Resolve the rate-table version for `year`, defaulting to the valuation year.
    pub async fn resolve_rate(
        &self,
        building_type: &BuildingType,
        region: &Region,
        year: Option<i32>,
    ) -> Result<RateTableEntry, ValuationError> {
        let year = year.unwrap_or_else(|| self.engine.current_year());
        let store = Arc::clone(&self.store);
        let (lookup_type, lookup_region) = (building_type.clone(), region.clone());
        let versions = call_upstream(
            Upstream::RateTableStore,
            self.config.upstream_timeout,
            move || store.version_set(&lookup_type, &lookup_region),
        )
        .await?;
        resolve_entry(&versions, building_type, region, year)
    }

    async fn fetch_market(&self, region: &Region) -> Result<Option<MarketData>, ValuationError> {
        let market = Arc::clone(&self.market);
        let region = region.clone();
        call_upstream(
            Upstream::MarketDataProvider,
            self.config.upstream_timeout,
            move || market.market_data(&region),
        )
        .await
    }

    /// Value one parcel. Without caller-supplied market data the provider is consulted.
    pub async fn valuate(
        &self,
        snapshot: &PropertySnapshot,
        factors: &ValuationFactors,
        market_data: Option<&MarketData>,
    ) -> Result<ValuationResult, ValuationError> {
        self.valuate_pinned(snapshot, factors, market_data, None).await
    }

    /// Same as [`Self::valuate`] but resolves the rate table against `matrix_year`.
    pub async fn valuate_pinned(
        &self,
        snapshot: &PropertySnapshot,
        factors: &ValuationFactors,
        market_data: Option<&MarketData>,
        matrix_year: Option<i32>,
    ) -> Result<ValuationResult, ValuationError> {
        self.engine.validate(snapshot, factors)?;

        let entry = self
            .resolve_rate(&snapshot.building_type, &snapshot.region, matrix_year)
            .await?;

        let fetched;
        let market_data = match market_data {
            Some(data) => Some(data),
            None => {
                fetched = self.fetch_market(&snapshot.region).await?;
                fetched.as_ref()
            }
        };

        self.engine.valuate(snapshot, factors, &entry, market_data)
    }

    /// Value each request independently. Item failures are recorded in the report; only a
    /// malformed batch fails the call as a whole.
    pub async fn valuate_batch(
        &self,
        requests: Vec<BatchValuationRequest>,
        market_data: Option<MarketData>,
        cancel: &BatchCancellation,
    ) -> Result<BatchValuationReport, ValuationError> {
        self.check_batch(requests.len(), market_data.as_ref())?;
        let market_data = market_data.map(Arc::new);

        let jobs: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let service = self.clone();
                let market_data = market_data.clone();
                let job = async move {
                    service
                        .valuate(&request.snapshot, &request.factors, market_data.as_deref())
                        .await
                };
                (request.id, job)
            })
            .collect();

        Ok(self.fan_out(jobs, cancel).await)
    }

    /// Portfolio variant of [`Self::valuate_batch`] that loads each parcel by id first.
    pub async fn valuate_parcels<P>(
        &self,
        parcels: Arc<P>,
        ids: Vec<ParcelId>,
        market_data: Option<MarketData>,
        cancel: &BatchCancellation,
    ) -> Result<BatchValuationReport, ValuationError>
    where
        P: ParcelRepository + 'static,
    {
        self.check_batch(ids.len(), market_data.as_ref())?;
        let market_data = market_data.map(Arc::new);

        let jobs: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let service = self.clone();
                let parcels = Arc::clone(&parcels);
                let market_data = market_data.clone();
                let lookup_id = id.clone();
                let job = async move {
                    let record = call_upstream(
                        Upstream::ParcelRepository,
                        service.config.upstream_timeout,
                        {
                            let lookup_id = lookup_id.clone();
                            move || parcels.fetch(&lookup_id)
                        },
                    )
                    .await?
                    .ok_or_else(|| ValuationError::ParcelNotFound {
                        parcel_id: lookup_id.to_string(),
                    })?;
                    service
                        .valuate(&record.snapshot, &record.factors, market_data.as_deref())
                        .await
                };
                (id, job)
            })
            .collect();

        Ok(self.fan_out(jobs, cancel).await)
    }

    fn check_batch(
        &self,
        len: usize,
        market_data: Option<&MarketData>,
    ) -> Result<(), ValuationError> {
        if len > self.config.max_batch_size {
            return Err(ValuationError::validation(
                "batch",
                format!(
                    "{len} parcels submitted, limit is {}",
                    self.config.max_batch_size
                ),
            ));
        }
        if let Some(market_data) = market_data {
            market_data.validate()?;
        }
        Ok(())
    }

    async fn fan_out<F>(
        &self,
        jobs: Vec<(ParcelId, F)>,
        cancel: &BatchCancellation,
    ) -> BatchValuationReport
    where
        F: Future<Output = Result<ValuationResult, ValuationError>> + Send + 'static,
    {
        let total = jobs.len();
        let parallelism = self.config.batch_parallelism.max(1);
        info!(total, parallelism, "starting batch valuation");

        let semaphore = Arc::new(Semaphore::new(parallelism));
        let mut slots = Vec::with_capacity(total);
        for (id, job) in jobs {
            if cancel.is_cancelled() {
                slots.push((id, Slot::Skipped));
                continue;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                slots.push((id, Slot::Skipped));
                continue;
            };
            // Cancellation may land while waiting for a permit.
            if cancel.is_cancelled() {
                drop(permit);
                slots.push((id, Slot::Skipped));
                continue;
            }
            let handle = tokio::spawn(async move {
                let _permit = permit;
                job.await
            });
            slots.push((id, Slot::Running(handle)));
        }

        let mut report = BatchValuationReport::with_capacity(total);
        for (id, slot) in slots {
            let outcome = match slot {
                Slot::Skipped => Err(ValuationError::Cancelled),
                Slot::Running(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_error) => Err(ValuationError::Computation(format!(
                        "valuation task failed: {join_error}"
                    ))),
                },
            };
            match &outcome {
                Err(ValuationError::Cancelled) | Ok(_) => {}
                Err(error) => {
                    warn!(parcel = %id, kind = error.kind(), error = %error, "parcel valuation failed")
                }
            }
            report.push(id, outcome);
        }

        let summary = report.summary();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "finished batch valuation"
        );
        report
    }
}

/// Run a synchronous collaborator call on the blocking pool under a deadline.
async fn call_upstream<T, E, F>(
    upstream: Upstream,
    timeout: Duration,
    call: F,
) -> Result<T, ValuationError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(error))) => {
            warn!(%upstream, error = %error, "upstream call failed");
            Err(ValuationError::Upstream {
                upstream,
                reason: error.to_string(),
            })
        }
        Ok(Err(join_error)) => Err(ValuationError::Upstream {
            upstream,
            reason: format!("lookup task failed: {join_error}"),
        }),
        Err(_) => {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(%upstream, timeout_ms, "upstream call timed out");
            Err(ValuationError::UpstreamTimeout {
                upstream,
                timeout_ms,
            })
        }
    }
}
