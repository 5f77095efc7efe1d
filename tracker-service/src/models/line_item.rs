//! Invoice line item model for tracker-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Classification tag carried by a single line item.
///
/// Variant order is lexicographic by wire name so sorted tag sets read the
/// same in Rust and in persisted reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Labour,
    Sales,
    Service,
    Unspecified,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Labour => "labour",
            LineType::Sales => "sales",
            LineType::Service => "service",
            LineType::Unspecified => "unspecified",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "labour" => LineType::Labour,
            "sales" => LineType::Sales,
            "service" => LineType::Service,
            _ => LineType::Unspecified,
        }
    }

    /// Normalize a raw registry category to a line type.
    ///
    /// Never returns `Sales`: sales is inferred from the absence of a code
    /// mapping, not from category text. Any non-empty category that is not
    /// `labour` and mentions neither `tyre` nor `service` maps to `Labour`;
    /// historical registry data relies on this catch-all.
    pub fn from_category(category: Option<&str>) -> Self {
        let raw = match category {
            Some(raw) if !raw.is_empty() => raw,
            _ => return LineType::Unspecified,
        };

        let lowered = raw.trim().to_lowercase();
        if lowered == "labour" {
            LineType::Labour
        } else if lowered.contains("tyre") || lowered.contains("service") {
            LineType::Service
        } else {
            LineType::Labour
        }
    }
}

/// Line item on an invoice, classified and persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub code: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub order_type: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for persisting a classified line item.
#[derive(Debug, Clone)]
pub struct CreateLineItem {
    pub code: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub order_type: LineType,
}
