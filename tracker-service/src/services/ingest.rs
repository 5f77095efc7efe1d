//! Invoice ingestion service.
//!
//! Orchestrates the two-step upload flow: enrich extracted rows for the
//! operator to confirm, then persist the classified line items and refresh
//! the owning order's type. Extraction itself (PDF to rows) happens
//! upstream.

use crate::classify::{
    classify_invoice, parse_decimal, CodeRegistry, ExtractedLineItem, TypeDetection,
};
use crate::models::{CreateInvoice, Invoice, InvoiceTotals, LineType, OrderType};
use crate::services::database::Database;
use crate::services::metrics::{CLASSIFICATIONS_TOTAL, ERRORS_TOTAL};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use service_core::utils::retry::{retry_db_call, RetryConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Category information for one item code, for preview display.
#[derive(Debug, Clone, Serialize)]
pub struct CodeCategoryInfo {
    pub category: String,
    pub line_type: LineType,
}

/// One aggregated row enriched for operator confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewItem {
    pub code: Option<String>,
    pub description: String,
    pub qty: Decimal,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub category: String,
    pub line_type: LineType,
}

/// Preview of an extracted invoice before anything is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct InvoicePreview {
    pub items: Vec<PreviewItem>,
    pub detection: TypeDetection,
}

/// Confirmed upload ready for persistence. Monetary fields arrive as the
/// raw extracted text; unparsable amounts default to zero.
#[derive(Debug, Clone, Default)]
pub struct IngestInvoice {
    pub order_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub code_no: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Option<String>,
    pub tax_rate: Option<String>,
    pub tax_amount: Option<String>,
    pub total_amount: Option<String>,
    pub items: Vec<ExtractedLineItem>,
}

/// Result of a persisted upload.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub invoice: Invoice,
    pub detection: TypeDetection,
    /// Order-level type after aggregating across every linked invoice,
    /// when the upload was attached to an order.
    pub order_type: Option<OrderType>,
    pub order_categories: Vec<String>,
}

/// In-process entry point for invoice uploads and manual line-item edits.
#[derive(Clone)]
pub struct IngestService {
    db: Arc<Database>,
    retry: RetryConfig,
}

impl IngestService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            retry: RetryConfig::default(),
        }
    }

    /// Resolve category information for a set of item codes. Codes with no
    /// active mapping come back as sales, so the preview can badge every
    /// row.
    #[instrument(skip(self, codes), fields(codes = codes.len()))]
    pub async fn code_categories(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, CodeCategoryInfo>, AppError> {
        let cleaned: Vec<String> = codes
            .iter()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();
        if cleaned.is_empty() {
            return Ok(HashMap::new());
        }

        let found = self.db.lookup(&cleaned).await?;

        let mut result = HashMap::new();
        for code in cleaned {
            let info = match found.get(&code) {
                Some(category) => CodeCategoryInfo {
                    category: category.clone(),
                    line_type: LineType::from_category(Some(category)),
                },
                None => CodeCategoryInfo {
                    category: "Sales".to_string(),
                    line_type: LineType::Sales,
                },
            };
            result.insert(code, info);
        }

        Ok(result)
    }

    /// Step 1: aggregate and classify extracted rows for operator review.
    /// Nothing is persisted.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn preview(&self, items: &[ExtractedLineItem]) -> Result<InvoicePreview, AppError> {
        let classified = classify_invoice(items, self.db.as_ref()).await?;

        let items = classified
            .line_items
            .iter()
            .map(|item| {
                let category = item
                    .code
                    .as_ref()
                    .and_then(|code| classified.detection.mapping.mapped.get(code))
                    .cloned()
                    .unwrap_or_else(|| "Sales".to_string());
                PreviewItem {
                    code: item.code.clone(),
                    description: item.description.clone(),
                    qty: item.quantity,
                    unit: item.unit.clone(),
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                    category,
                    line_type: item.order_type,
                }
            })
            .collect();

        Ok(InvoicePreview {
            items,
            detection: classified.detection,
        })
    }

    /// Step 2: persist a confirmed upload.
    ///
    /// Re-uploading a document with the same invoice number for the same
    /// order replaces that invoice's line items in one transaction; the
    /// same number arriving for a different order gets a fresh generated
    /// number instead of clobbering someone else's invoice.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn ingest_invoice(&self, input: IngestInvoice) -> Result<IngestOutcome, AppError> {
        let classified = classify_invoice(&input.items, self.db.as_ref()).await?;

        let extracted = InvoiceTotals {
            subtotal: parse_money(input.subtotal.as_deref()),
            tax_amount: parse_money(input.tax_amount.as_deref()),
            total_amount: parse_money(input.total_amount.as_deref()),
        };

        let invoice = self.resolve_invoice(&input, extracted).await?;

        let line_items = &classified.line_items;
        let db = &self.db;
        let invoice = retry_db_call(&self.retry, "replace_invoice_line_items", || {
            db.replace_invoice_line_items(invoice.invoice_id, line_items, extracted)
        })
        .await
        .map_err(|error| {
            ERRORS_TOTAL.with_label_values(&[error.kind()]).inc();
            error
        })?;

        let mut order_type = None;
        let mut order_categories = Vec::new();
        if let Some(order_id) = invoice.order_id {
            let (combined, categories) = self.db.refresh_order_type(order_id).await?;
            order_type = Some(combined);
            order_categories = categories;
        }

        CLASSIFICATIONS_TOTAL
            .with_label_values(&[classified.detection.order_type.as_str()])
            .inc();
        info!(
            invoice_id = %invoice.invoice_id,
            invoice_type = classified.detection.order_type.as_str(),
            line_items = line_items.len(),
            "Invoice ingested"
        );

        Ok(IngestOutcome {
            invoice,
            detection: classified.detection,
            order_type,
            order_categories,
        })
    }

    async fn resolve_invoice(
        &self,
        input: &IngestInvoice,
        extracted: InvoiceTotals,
    ) -> Result<Invoice, AppError> {
        if let Some(number) = input
            .invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|number| !number.is_empty())
        {
            if let Some(existing) = self.db.get_invoice_by_number(number).await? {
                if existing.order_id.is_some() && existing.order_id == input.order_id {
                    info!(
                        invoice_id = %existing.invoice_id,
                        invoice_number = %existing.invoice_number,
                        "Re-upload updates existing invoice"
                    );
                    return Ok(existing);
                }
                // Same number, different order: keep both documents.
                return self
                    .db
                    .create_invoice(&self.create_input(input, extracted, None))
                    .await;
            }
            return self
                .db
                .create_invoice(&self.create_input(input, extracted, Some(number.to_string())))
                .await;
        }

        self.db
            .create_invoice(&self.create_input(input, extracted, None))
            .await
    }

    fn create_input(
        &self,
        input: &IngestInvoice,
        extracted: InvoiceTotals,
        invoice_number: Option<String>,
    ) -> CreateInvoice {
        CreateInvoice {
            branch_id: input.branch_id,
            order_id: input.order_id,
            customer_id: input.customer_id,
            vehicle_id: input.vehicle_id,
            invoice_number,
            invoice_date: input.invoice_date,
            code_no: input.code_no.clone(),
            reference: input.reference.clone(),
            subtotal: extracted.subtotal,
            tax_rate: parse_money(input.tax_rate.as_deref()),
            tax_amount: extracted.tax_amount,
            total_amount: extracted.total_amount,
            notes: input.notes.clone(),
        }
    }
}

fn parse_money(raw: Option<&str>) -> Decimal {
    raw.and_then(parse_decimal).unwrap_or(Decimal::ZERO)
}
