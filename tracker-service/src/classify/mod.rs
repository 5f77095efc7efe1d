//! Order-type classification pipeline.
//!
//! Flow: extracted rows -> [`aggregate_line_items`] -> registry lookup ->
//! category normalization -> [`detect_order_type`] -> classified line items
//! plus an invoice-level [`TypeDetection`]. [`RevenueBucket`] later re-reads
//! the persisted per-item tags to bucket revenue.

pub mod aggregator;
pub mod detector;
pub mod registry;
pub mod revenue;

pub use aggregator::{
    aggregate_line_items, parse_decimal, AggregatedLineItem, ExtractedLineItem,
};
pub use detector::{
    combine_detections, detect_order_type, mixed_categories_json, CodeMapping, TypeDetection,
};
pub use registry::{CodeRegistry, StaticCodeRegistry};
pub use revenue::RevenueBucket;

use crate::models::{CreateLineItem, LineType};
use rust_decimal::Decimal;
use service_core::error::AppError;

/// Classified output for one invoice.
#[derive(Debug, Clone)]
pub struct ClassifiedInvoice {
    pub line_items: Vec<CreateLineItem>,
    pub detection: TypeDetection,
}

/// Run the full pipeline over one invoice's extracted rows.
///
/// Each persisted item's tag is a pure function of its code for a given
/// registry state: mapped codes take their normalized category, unmapped
/// and absent codes are sales. Items without a code also fold a sales
/// contribution into the invoice-level detection, since they represent
/// unregistered products.
pub async fn classify_invoice(
    items: &[ExtractedLineItem],
    registry: &dyn CodeRegistry,
) -> Result<ClassifiedInvoice, AppError> {
    let aggregated = aggregate_line_items(items);

    let codes: Vec<String> = aggregated
        .iter()
        .filter_map(|item| item.code.clone())
        .collect();
    let mut detection = detect_order_type(&codes, registry).await?;

    if aggregated.iter().any(|item| item.code.is_none()) {
        detection = detection.with_sales_contribution();
    }

    let line_items = aggregated
        .into_iter()
        .map(|item| {
            let order_type = match &item.code {
                Some(code) => match detection.mapping.mapped.get(code) {
                    Some(category) => LineType::from_category(Some(category)),
                    None => LineType::Sales,
                },
                None => LineType::Sales,
            };

            let line_total = item.qty * item.unit_price;
            CreateLineItem {
                code: item.code,
                description: item.description,
                quantity: item.qty,
                unit: item.unit,
                unit_price: item.unit_price,
                tax_rate: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                line_total,
                order_type,
            }
        })
        .collect();

    Ok(ClassifiedInvoice {
        line_items,
        detection,
    })
}
