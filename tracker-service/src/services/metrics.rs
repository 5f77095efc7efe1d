//! Prometheus metrics for tracker-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Invoice classification counter by resulting order type.
pub static CLASSIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tracker_classifications_total",
        "Total number of invoice classifications by resulting order type",
        &["order_type"] // labour, service, sales, mixed, unspecified
    )
    .expect("Failed to register classifications_total")
});

/// Order counter by status written.
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tracker_orders_total",
        "Total number of order writes by status",
        &["status"]
    )
    .expect("Failed to register orders_total")
});

/// Revenue report counter by window.
pub static REVENUE_REPORTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tracker_revenue_reports_total",
        "Total number of revenue reports served",
        &["window"] // range, month, all_time
    )
    .expect("Failed to register revenue_reports_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tracker_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tracker_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&CLASSIFICATIONS_TOTAL);
    Lazy::force(&ORDERS_TOTAL);
    Lazy::force(&REVENUE_REPORTS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
