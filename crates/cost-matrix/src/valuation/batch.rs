use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::domain::{ParcelId, PropertySnapshot, ValuationFactors};
use super::error::ValuationError;
use super::result::ValuationResult;

/// One parcel submitted to a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchValuationRequest {
    pub id: ParcelId,
    pub snapshot: PropertySnapshot,
    pub factors: ValuationFactors,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchItemOutcome {
    pub id: ParcelId,
    pub outcome: Result<ValuationResult, ValuationError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Subset of `failed` that never started because the batch was cancelled.
    pub cancelled: usize,
}

/// Per-item outcomes in input order plus aggregate counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchValuationReport {
    results: Vec<BatchItemOutcome>,
    summary: BatchSummary,
}

impl BatchValuationReport {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            summary: BatchSummary::default(),
        }
    }

    pub fn push(&mut self, id: ParcelId, outcome: Result<ValuationResult, ValuationError>) {
        self.summary.total += 1;
        match &outcome {
            Ok(_) => self.summary.succeeded += 1,
            Err(ValuationError::Cancelled) => {
                self.summary.failed += 1;
                self.summary.cancelled += 1;
            }
            Err(_) => self.summary.failed += 1,
        }
        self.results.push(BatchItemOutcome { id, outcome });
    }

    pub fn results(&self) -> &[BatchItemOutcome] {
        &self.results
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    pub fn view(&self) -> BatchReportView<'_> {
        BatchReportView {
            results: self.results.iter().map(BatchItemView::from).collect(),
            summary: self.summary,
        }
    }
}

/// Serializable projection of a report for API responses.
#[derive(Debug, Serialize)]
pub struct BatchReportView<'a> {
    pub results: Vec<BatchItemView<'a>>,
    pub summary: BatchSummary,
}

#[derive(Debug, Serialize)]
pub struct BatchItemView<'a> {
    pub id: &'a ParcelId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a ValuationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchErrorView>,
}

#[derive(Debug, Serialize)]
pub struct BatchErrorView {
    pub kind: &'static str,
    pub message: String,
}

impl<'a> From<&'a BatchItemOutcome> for BatchItemView<'a> {
    fn from(item: &'a BatchItemOutcome) -> Self {
        match &item.outcome {
            Ok(result) => Self {
                id: &item.id,
                status: "success",
                result: Some(result),
                error: None,
            },
            Err(error) => Self {
                id: &item.id,
                status: "error",
                result: None,
                error: Some(BatchErrorView {
                    kind: error.kind(),
                    message: error.to_string(),
                }),
            },
        }
    }
}

/// Shared flag that stops a running batch from scheduling further items.
#[derive(Debug, Clone, Default)]
pub struct BatchCancellation {
    cancelled: Arc<AtomicBool>,
}

impl BatchCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_cancelled_items_as_failed() {
        let mut report = BatchValuationReport::with_capacity(3);
        report.push(
            ParcelId("p-1".to_string()),
            Err(ValuationError::validation("area_units", "must be positive")),
        );
        report.push(ParcelId("p-2".to_string()), Err(ValuationError::Cancelled));
        report.push(ParcelId("p-3".to_string()), Err(ValuationError::Cancelled));

        let summary = report.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.succeeded + summary.failed, summary.total);
    }

    #[test]
    fn view_serializes_error_kind_and_status() {
        let mut report = BatchValuationReport::default();
        report.push(
            ParcelId("p-9".to_string()),
            Err(ValuationError::NotFound {
                building_type: "R9".to_string(),
                region: "Eastern".to_string(),
            }),
        );
        let value = serde_json::to_value(report.view()).expect("serializes");
        assert_eq!(value["results"][0]["id"], "p-9");
        assert_eq!(value["results"][0]["status"], "error");
        assert_eq!(value["results"][0]["error"]["kind"], "not_found");
        assert!(value["results"][0].get("result").is_none());
        assert_eq!(value["summary"]["failed"], 1);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = BatchCancellation::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
