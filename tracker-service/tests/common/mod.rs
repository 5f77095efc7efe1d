//! Test helpers for the classification pipeline tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracker_service::classify::{ExtractedLineItem, StaticCodeRegistry};
use tracker_service::models::LineItem;
use uuid::Uuid;

/// Registry fixture mirroring a typical labour code table: labour codes,
/// tyre/service codes, and one deactivated entry.
pub fn registry() -> StaticCodeRegistry {
    StaticCodeRegistry::new()
        .with_entry("L100", "labour")
        .with_entry("L200", "labour")
        .with_entry("T200", "tyre service")
        .with_entry("T300", "tyre service / makill")
        .with_entry("S300", "service")
        .with_inactive_entry("X900", "labour")
}

/// Build an extracted row from raw field text.
pub fn item(
    code: Option<&str>,
    description: &str,
    qty: Option<&str>,
    rate: Option<&str>,
    value: Option<&str>,
) -> ExtractedLineItem {
    ExtractedLineItem {
        code: code.map(str::to_string),
        description: description.to_string(),
        qty: qty.map(str::to_string),
        unit: None,
        rate: rate.map(str::to_string),
        value: value.map(str::to_string),
    }
}

/// Build a persisted line item for revenue attribution tests.
pub fn line_item(order_type: &str, line_total: i64, tax_amount: i64) -> LineItem {
    LineItem {
        line_item_id: Uuid::new_v4(),
        invoice_id: Uuid::new_v4(),
        code: None,
        description: "Item".to_string(),
        quantity: Decimal::ONE,
        unit: None,
        unit_price: Decimal::from(line_total),
        tax_rate: Decimal::ZERO,
        tax_amount: Decimal::from(tax_amount),
        line_total: Decimal::from(line_total),
        order_type: order_type.to_string(),
        created_utc: Utc::now(),
    }
}

pub fn dec(raw: &str) -> Decimal {
    raw.parse().expect("valid decimal literal")
}

pub fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|code| code.to_string()).collect()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 3, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}
