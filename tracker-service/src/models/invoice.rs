//! Invoice model for tracker-service.

use super::line_item::CreateLineItem;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "issued" => InvoiceStatus::Issued,
            "paid" => InvoiceStatus::Paid,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }

    /// Revenue reports consider draft, issued and paid invoices; cancelled
    /// invoices never count.
    pub fn counts_toward_revenue(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Draft | InvoiceStatus::Issued | InvoiceStatus::Paid
        )
    }
}

/// Billing document, optionally linked to an order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub status: String,
    pub branch_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub invoice_date: NaiveDate,
    pub code_no: Option<String>,
    pub reference: Option<String>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub branch_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub code_no: Option<String>,
    pub reference: Option<String>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

/// Filter parameters for revenue reports.
#[derive(Debug, Clone, Default)]
pub struct RevenueFilter {
    pub branch_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Final invoice amounts after reconciling extracted header values with
/// line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Reconcile extracted header amounts with classified line items.
///
/// Extraction is authoritative when it found values. A missing or zero
/// subtotal is recovered from the line items so revenue never reads zero
/// when billable rows exist; tax and total fall back the same way.
pub fn finalize_totals(
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    items: &[CreateLineItem],
) -> InvoiceTotals {
    let mut totals = InvoiceTotals {
        subtotal,
        tax_amount,
        total_amount,
    };

    if totals.subtotal.is_zero() && !items.is_empty() {
        let items_subtotal: Decimal = items.iter().map(|item| item.line_total).sum();
        if items_subtotal > Decimal::ZERO {
            totals.subtotal = items_subtotal;
            if totals.tax_amount.is_zero() {
                totals.tax_amount = items.iter().map(|item| item.tax_amount).sum();
            }
        }
    }

    if totals.total_amount.is_zero() {
        totals.total_amount = totals.subtotal + totals.tax_amount;
    }

    totals
}

/// Generate an invoice number: INV + UTC timestamp + 4 hex chars. Callers
/// persisting invoices retry on the rare collision.
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("INV{}{}", now.format("%Y%m%d%H%M%S"), suffix)
}
