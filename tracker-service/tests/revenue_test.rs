//! Revenue attribution tests for tracker-service.

mod common;

use common::{dec, line_item};
use rust_decimal::Decimal;
use tracker_service::classify::RevenueBucket;
use tracker_service::models::InvoiceStatus;

#[test]
fn line_values_bucket_by_persisted_order_type() {
    let items = vec![
        line_item("sales", 150_000, 0),
        line_item("service", 30_000, 0),
        line_item("labour", 50_000, 0),
        line_item("labour", 20_000, 0),
    ];

    let bucket = RevenueBucket::from_line_items(&items);

    assert_eq!(bucket.sales, dec("150000"));
    assert_eq!(bucket.service, dec("30000"));
    assert_eq!(bucket.labour, dec("70000"));
    assert_eq!(bucket.unknown, Decimal::ZERO);
    assert_eq!(bucket.total, dec("250000"));
}

#[test]
fn tax_is_included_in_line_value() {
    let items = vec![line_item("labour", 100, 18)];

    let bucket = RevenueBucket::from_line_items(&items);

    assert_eq!(bucket.labour, dec("118"));
    assert_eq!(bucket.total, dec("118"));
}

#[test]
fn unrecognized_tags_fall_back_to_unknown() {
    let items = vec![
        line_item("unspecified", 10, 0),
        line_item("unknown", 20, 0),
        line_item("", 30, 0),
        line_item("garbage", 40, 0),
        // A tag colliding with a report field must not leak into totals
        // twice.
        line_item("total", 50, 0),
    ];

    let bucket = RevenueBucket::from_line_items(&items);

    assert_eq!(bucket.unknown, dec("150"));
    assert_eq!(bucket.total, dec("150"));
    assert_eq!(bucket.sales, Decimal::ZERO);
}

#[test]
fn total_always_equals_the_sum_of_buckets() {
    let items = vec![
        line_item("sales", 11, 1),
        line_item("service", 22, 2),
        line_item("labour", 33, 3),
        line_item("unspecified", 44, 4),
        line_item("nonsense", 55, 5),
    ];

    let bucket = RevenueBucket::from_line_items(&items);

    assert_eq!(
        bucket.total,
        bucket.sales + bucket.service + bucket.labour + bucket.unknown
    );
}

#[test]
fn empty_input_yields_the_zero_bucket() {
    let bucket = RevenueBucket::from_line_items(&[]);

    assert_eq!(bucket, RevenueBucket::default());
    assert_eq!(bucket.total, Decimal::ZERO);
    assert_eq!(bucket.count, 0);
}

#[test]
fn count_is_attached_by_the_reporting_layer() {
    let items = vec![line_item("sales", 100, 0)];

    let bucket = RevenueBucket::from_line_items(&items).with_count(7);

    assert_eq!(bucket.count, 7);
    assert_eq!(bucket.sales, dec("100"));
}

#[test]
fn cancelled_invoices_never_count_toward_revenue() {
    assert!(InvoiceStatus::Draft.counts_toward_revenue());
    assert!(InvoiceStatus::Issued.counts_toward_revenue());
    assert!(InvoiceStatus::Paid.counts_toward_revenue());
    assert!(!InvoiceStatus::Cancelled.counts_toward_revenue());
}

#[test]
fn bucket_serializes_money_as_strings() {
    let items = vec![line_item("sales", 150_000, 0)];
    let bucket = RevenueBucket::from_line_items(&items).with_count(1);

    let json = serde_json::to_value(&bucket).expect("bucket serializes");

    // Decimal-as-string keeps dashboard JSON precision-safe.
    assert_eq!(json["sales"], serde_json::json!("150000"));
    assert_eq!(json["total"], serde_json::json!("150000"));
    assert_eq!(json["count"], serde_json::json!(1));
    assert!(json["service"].is_string());
}
