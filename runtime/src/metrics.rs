//! Business metrics for bookings, payments and the event catalog.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `eventbook_bookings_total{outcome}` - Booking calls by outcome (`confirmed`
//!   or the error code, lower-cased)
//! - `eventbook_booking_conflicts_total` - Version conflicts hit while committing
//! - `eventbook_payments_total{status}` - Payments by status (`succeeded`,
//!   `failed`, `refunded`, `refund_failed`)
//! - `eventbook_events_created_total` - Events created by organizers
//! - `eventbook_store_conflicts_total{record}` - Version mismatches seen by the
//!   `PostgreSQL` store (`event` or `user`)
//!
//! ## Histograms
//! - `eventbook_booking_duration_seconds` - Wall time of a booking call
//!
//! Recording goes through the `metrics` facade; nothing is exported until a
//! recorder is installed with [`install_prometheus`].

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the global recorder
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register all metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "eventbook_bookings_total",
        "Total number of booking calls by outcome"
    );
    describe_counter!(
        "eventbook_booking_conflicts_total",
        "Version conflicts encountered while committing a booking"
    );
    describe_histogram!(
        "eventbook_booking_duration_seconds",
        "Time taken by a booking call, retries included"
    );
    describe_counter!(
        "eventbook_payments_total",
        "Total number of payment operations by status"
    );
    describe_counter!(
        "eventbook_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "eventbook_store_conflicts_total",
        "Conditional writes rejected by the PostgreSQL store, by record kind"
    );

    tracing::info!("Eventbook metrics registered");
}

/// Install the Prometheus recorder and return the handle used to render the
/// scrape output.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_prometheus() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    Ok(handle)
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a finished booking call.
    pub fn record_outcome(outcome: &'static str, duration: Duration) {
        counter!("eventbook_bookings_total", "outcome" => outcome).increment(1);
        histogram!("eventbook_booking_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a version conflict on commit.
    pub fn record_conflict() {
        counter!("eventbook_booking_conflicts_total").increment(1);
    }
}

/// Payment metrics recorder.
pub struct PaymentMetrics;

impl PaymentMetrics {
    /// Record a payment operation.
    pub fn record(status: &'static str) {
        counter!("eventbook_payments_total", "status" => status).increment(1);
    }
}

/// Catalog metrics recorder.
pub struct CatalogMetrics;

impl CatalogMetrics {
    /// Record an event creation.
    pub fn record_created() {
        counter!("eventbook_events_created_total").increment(1);
    }
}

/// Map an error code to its metric label.
#[must_use]
pub fn outcome_label(code: &'static str) -> &'static str {
    match code {
        "NOT_AUTHENTICATED" => "not_authenticated",
        "EVENT_NOT_FOUND" => "event_not_found",
        "ALREADY_REGISTERED" => "already_registered",
        "EVENT_FULL" => "event_full",
        "PAYMENT_FAILED" => "payment_failed",
        _ => "store_error",
    }
}
