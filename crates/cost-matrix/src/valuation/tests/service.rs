use super::common::*;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ValuationConfig;
use crate::valuation::batch::BatchCancellation;
use crate::valuation::domain::{BuildingType, ParcelId, Region};
use crate::valuation::error::{Upstream, ValuationError};
use crate::valuation::market::{NoMarketData, StaticMarketData};
use crate::valuation::service::ValuationService;

#[tokio::test]
async fn rate_resolution_prefers_exact_year_then_latest_prior() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let building_type = BuildingType::parse("ResidentialR1").expect("valid");
    let region = Region::parse("Eastern").expect("valid");

    let pinned = service
        .resolve_rate(&building_type, &region, Some(2024))
        .await
        .expect("resolves");
    assert_eq!(pinned.year, 2024);

    let current = service
        .resolve_rate(&building_type, &region, None)
        .await
        .expect("resolves");
    assert_eq!(current.year, 2025);
}

#[tokio::test]
async fn valuate_uses_the_store_and_current_year() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let result = service
        .valuate(&snapshot(), &factors(), None)
        .await
        .expect("valuates");
    assert_eq!(result.matrix_year_used(), 2025);
    assert_eq!(
        result.total_cost(),
        2400.0 * 120.50 * 1.0 * 1.0 * 1.05 * 1.15
    );
}

#[tokio::test]
async fn pinned_matrix_year_selects_older_rates() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let result = service
        .valuate_pinned(&snapshot(), &factors(), None, Some(2024))
        .await
        .expect("valuates");
    assert_eq!(result.matrix_year_used(), 2024);
    assert_eq!(result.base_rate(), 115.0);
}

#[tokio::test]
async fn unknown_building_type_is_not_found() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let request = batch_request("p-1", "ResidentialR9");
    let err = service
        .valuate(&request.snapshot, &request.factors, None)
        .await
        .expect_err("unknown pair");
    assert!(matches!(err, ValuationError::NotFound { .. }));
}

#[tokio::test]
async fn provider_is_consulted_when_request_has_no_market_data() {
    let service = service_with(
        store(),
        StaticMarketData::new([market_data()]),
        valuation_config(),
    );
    let result = service
        .valuate(&snapshot(), &factors(), None)
        .await
        .expect("valuates");
    assert!(result.market_data_applied());
    assert!(result.market_value() > result.total_cost());
}

#[tokio::test]
async fn slow_store_surfaces_upstream_timeout() {
    let config = ValuationConfig {
        upstream_timeout: Duration::from_millis(50),
        ..valuation_config()
    };
    let service = service_with(
        SlowStore {
            delay: Duration::from_millis(300),
        },
        NoMarketData,
        config,
    );
    let err = service
        .valuate(&snapshot(), &factors(), None)
        .await
        .expect_err("times out");
    assert_eq!(
        err,
        ValuationError::UpstreamTimeout {
            upstream: Upstream::RateTableStore,
            timeout_ms: 50,
        }
    );
}

#[tokio::test]
async fn slow_market_provider_surfaces_upstream_timeout() {
    let config = ValuationConfig {
        upstream_timeout: Duration::from_millis(50),
        ..valuation_config()
    };
    let service = service_with(
        store(),
        SlowProvider {
            delay: Duration::from_millis(300),
        },
        config,
    );
    let err = service
        .valuate(&snapshot(), &factors(), None)
        .await
        .expect_err("times out");
    assert_eq!(
        err,
        ValuationError::UpstreamTimeout {
            upstream: Upstream::MarketDataProvider,
            timeout_ms: 50,
        }
    );

    let supplied = market_data();
    let result = service
        .valuate(&snapshot(), &factors(), Some(&supplied))
        .await
        .expect("supplied market data skips the provider");
    assert!(result.market_data_applied());
}

#[tokio::test]
async fn failing_collaborators_surface_as_upstream_errors() {
    let service = service_with(UnavailableStore, NoMarketData, valuation_config());
    let err = service
        .valuate(&snapshot(), &factors(), None)
        .await
        .expect_err("store down");
    assert!(matches!(
        err,
        ValuationError::Upstream {
            upstream: Upstream::RateTableStore,
            ..
        }
    ));

    let service = service_with(store(), UnavailableProvider, valuation_config());
    let err = service
        .valuate(&snapshot(), &factors(), None)
        .await
        .expect_err("provider down");
    assert!(matches!(
        err,
        ValuationError::Upstream {
            upstream: Upstream::MarketDataProvider,
            ..
        }
    ));
}

#[tokio::test]
async fn invalid_input_fails_before_any_lookup() {
    let config = ValuationConfig {
        upstream_timeout: Duration::from_millis(50),
        ..valuation_config()
    };
    let service = service_with(
        SlowStore {
            delay: Duration::from_millis(300),
        },
        NoMarketData,
        config,
    );
    let mut bad = snapshot();
    bad.area_units = -10.0;
    let err = service
        .valuate(&bad, &factors(), None)
        .await
        .expect_err("invalid area");
    assert!(matches!(err, ValuationError::Validation { field: "area_units", .. }));
}

#[tokio::test]
async fn batch_isolates_failures_and_keeps_input_order() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let requests = vec![
        batch_request("p-1", "ResidentialR1"),
        batch_request("p-2", "Warehouse"),
        batch_request("p-3", "ResidentialR1"),
    ];

    let report = service
        .valuate_batch(requests, None, &BatchCancellation::new())
        .await
        .expect("batch runs");

    let summary = report.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cancelled, 0);

    let ids: Vec<&str> = report.results().iter().map(|item| item.id.0.as_str()).collect();
    assert_eq!(ids, vec!["p-1", "p-2", "p-3"]);
    assert!(report.results()[0].outcome.is_ok());
    assert!(matches!(
        report.results()[1].outcome,
        Err(ValuationError::NotFound { .. })
    ));
    assert!(report.results()[2].outcome.is_ok());
}

#[tokio::test]
async fn oversized_batch_is_rejected_up_front() {
    let config = ValuationConfig {
        max_batch_size: 2,
        ..valuation_config()
    };
    let service = service_with(store(), NoMarketData, config);
    let requests = (1..=3)
        .map(|n| batch_request(&format!("p-{n}"), "ResidentialR1"))
        .collect();
    let err = service
        .valuate_batch(requests, None, &BatchCancellation::new())
        .await
        .expect_err("too many parcels");
    assert!(matches!(err, ValuationError::Validation { field: "batch", .. }));
}

#[tokio::test]
async fn cancelled_before_start_reports_every_item_as_cancelled() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let token = BatchCancellation::new();
    token.cancel();
    let requests = (1..=4)
        .map(|n| batch_request(&format!("p-{n}"), "ResidentialR1"))
        .collect();

    let report = service
        .valuate_batch(requests, None, &token)
        .await
        .expect("batch runs");
    let summary = report.summary();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.cancelled, 4);
    assert_eq!(summary.succeeded + summary.failed, summary.total);
}

#[tokio::test]
async fn cancellation_mid_batch_lets_started_items_finish() {
    let token = BatchCancellation::new();
    let config = ValuationConfig {
        batch_parallelism: 1,
        ..valuation_config()
    };
    let service = service_with(
        CancellingStore {
            token: token.clone(),
        },
        NoMarketData,
        config,
    );
    let requests = (1..=5)
        .map(|n| batch_request(&format!("p-{n}"), "ResidentialR1"))
        .collect();

    let report = service
        .valuate_batch(requests, None, &token)
        .await
        .expect("batch runs");
    let summary = report.summary();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.cancelled, 4);
    assert_eq!(summary.succeeded + summary.failed, summary.total);
    assert!(report.results()[0].outcome.is_ok());
    assert!(report.results()[1..]
        .iter()
        .all(|item| item.outcome == Err(ValuationError::Cancelled)));
}

#[tokio::test]
async fn batch_fan_out_respects_parallelism_bound() {
    let tracker = Arc::new(ConcurrencyTrackingStore::default());
    let service = ValuationService::new(
        Arc::clone(&tracker),
        Arc::new(NoMarketData),
        engine(),
        valuation_config(),
    );
    let requests = (1..=8)
        .map(|n| batch_request(&format!("p-{n}"), "ResidentialR1"))
        .collect();

    let report = service
        .valuate_batch(requests, None, &BatchCancellation::new())
        .await
        .expect("batch runs");
    assert_eq!(report.summary().succeeded, 8);
    let peak = tracker.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency {peak}");
}

#[tokio::test]
async fn portfolio_batch_reports_missing_parcels_per_item() {
    let service = service_with(store(), NoMarketData, valuation_config());
    let parcels = Arc::new(MemoryParcels::with([
        parcel("10-001", "ResidentialR1"),
        parcel("10-003", "ResidentialR1"),
    ]));
    let ids = ["10-001", "10-002", "10-003"]
        .into_iter()
        .map(|id| ParcelId(id.to_string()))
        .collect();

    let report = service
        .valuate_parcels(parcels, ids, Some(market_data()), &BatchCancellation::new())
        .await
        .expect("batch runs");

    assert_eq!(report.summary().succeeded, 2);
    assert_eq!(report.summary().failed, 1);
    assert!(matches!(
        &report.results()[1].outcome,
        Err(ValuationError::ParcelNotFound { parcel_id }) if parcel_id == "10-002"
    ));
    let first = report.results()[0].outcome.as_ref().expect("valued");
    assert!(first.market_data_applied());
}
