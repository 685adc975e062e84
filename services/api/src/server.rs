use crate::cli::ServeArgs;
use crate::infra::{factor_tables, load_rate_tables, sample_market, sample_parcels, AppState};
use crate::routes::with_valuation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cost_matrix::config::AppConfig;
use cost_matrix::error::AppError;
use cost_matrix::telemetry;
use cost_matrix::valuation::{ValuationEngine, ValuationService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(path) = args.rate_table_csv.take() {
        config.valuation.rate_table_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(load_rate_tables(&config.valuation)?);
    let market = Arc::new(sample_market()?);
    let parcels = Arc::new(sample_parcels()?);
    let engine = ValuationEngine::new(factor_tables(&config.valuation));
    let service = ValuationService::new(store, market, engine, config.valuation.clone());

    let app = with_valuation_routes(service, parcels)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        timeout_ms = config.valuation.upstream_timeout.as_millis() as u64,
        parallelism = config.valuation.batch_parallelism,
        "cost matrix valuation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
