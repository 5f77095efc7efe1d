//! Order-type detection from invoice item codes.
//!
//! Registry-mapped codes contribute their normalized category; codes with
//! no active mapping contribute `sales`. One distinct tag names the order
//! type outright, more than one makes the order mixed.

use super::registry::CodeRegistry;
use crate::models::{LineType, OrderType};
use serde::Serialize;
use service_core::error::AppError;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// How each code resolved during detection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeMapping {
    pub mapped: BTreeMap<String, String>,
    pub unmapped: Vec<String>,
    pub order_types_found: Vec<LineType>,
}

/// Result of classifying one invoice's worth of item codes.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDetection {
    pub order_type: OrderType,
    /// Distinct contributing categories, sorted; contains the literal
    /// `"sales"` when unmapped codes contributed.
    pub categories: Vec<String>,
    pub mapping: CodeMapping,
}

impl TypeDetection {
    fn empty(order_type: OrderType) -> Self {
        TypeDetection {
            order_type,
            categories: Vec::new(),
            mapping: CodeMapping::default(),
        }
    }

    /// Fold a sales contribution into this detection, for invoices whose
    /// aggregated items include rows without any item code.
    pub fn with_sales_contribution(mut self) -> Self {
        let mut tags: BTreeSet<LineType> =
            self.mapping.order_types_found.iter().copied().collect();
        tags.insert(LineType::Sales);

        let mut categories: BTreeSet<String> = self.categories.iter().cloned().collect();
        categories.insert("sales".to_string());

        self.mapping.order_types_found = tags.into_iter().collect();
        self.categories = categories.into_iter().collect();
        self.order_type = resolve_order_type(&self.mapping.order_types_found);
        self
    }
}

fn resolve_order_type(tags: &[LineType]) -> OrderType {
    match tags {
        [] => OrderType::Sales,
        [single] => OrderType::from(*single),
        _ => OrderType::Mixed,
    }
}

/// Determine the order type for a set of invoice item codes.
///
/// An empty input means "nothing was extracted" and yields `unspecified`;
/// input that becomes empty after trimming blanks yields `sales`. The two
/// branches are deliberately distinct. Malformed codes are filtered, never
/// rejected.
pub async fn detect_order_type(
    item_codes: &[String],
    registry: &dyn CodeRegistry,
) -> Result<TypeDetection, AppError> {
    if item_codes.is_empty() {
        return Ok(TypeDetection::empty(OrderType::Unspecified));
    }

    let cleaned: Vec<String> = item_codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();

    if cleaned.is_empty() {
        return Ok(TypeDetection::empty(OrderType::Sales));
    }

    let found = registry.lookup(&cleaned).await?;

    let mut mapped: BTreeMap<String, String> = BTreeMap::new();
    let mut categories_found: BTreeSet<String> = BTreeSet::new();
    for (code, category) in &found {
        mapped.insert(code.clone(), category.clone());
        categories_found.insert(category.clone());
    }

    let unmapped: Vec<String> = cleaned
        .iter()
        .filter(|code| !found.contains_key(*code))
        .cloned()
        .collect();

    let mut order_types_found: BTreeSet<LineType> = categories_found
        .iter()
        .map(|category| LineType::from_category(Some(category)))
        .collect();

    if !unmapped.is_empty() {
        order_types_found.insert(LineType::Sales);
        categories_found.insert("sales".to_string());
    }

    let tags: Vec<LineType> = order_types_found.into_iter().collect();
    let categories: Vec<String> = if tags.is_empty() {
        vec!["sales".to_string()]
    } else {
        categories_found.into_iter().collect()
    };
    let order_type = resolve_order_type(&tags);

    info!(
        codes = cleaned.len(),
        mapped = mapped.len(),
        unmapped = unmapped.len(),
        order_type = order_type.as_str(),
        "Order type detected"
    );

    Ok(TypeDetection {
        order_type,
        categories,
        mapping: CodeMapping {
            mapped,
            unmapped,
            order_types_found: tags,
        },
    })
}

/// Re-derive an order's type from the detections of every invoice linked
/// to it. Categories map back to tags (the literal `"sales"` stays sales);
/// a detection without categories contributes its own order type. Returns
/// the combined type and the union of categories, sorted.
pub fn combine_detections(detections: &[TypeDetection]) -> (OrderType, Vec<String>) {
    let mut tags: BTreeSet<OrderType> = BTreeSet::new();
    let mut categories: BTreeSet<String> = BTreeSet::new();

    for detection in detections {
        if detection.categories.is_empty() {
            tags.insert(detection.order_type);
        } else {
            for category in &detection.categories {
                if category == "sales" {
                    tags.insert(OrderType::Sales);
                } else {
                    tags.insert(OrderType::from(LineType::from_category(Some(category))));
                }
            }
        }
        categories.extend(detection.categories.iter().cloned());
    }

    let tags: Vec<OrderType> = tags.into_iter().collect();
    let combined = match tags.as_slice() {
        [] => OrderType::Sales,
        [single] => *single,
        _ => OrderType::Mixed,
    };

    (combined, categories.into_iter().collect())
}

/// JSON payload for `orders.mixed_categories`: only mixed orders with
/// known categories carry one.
pub fn mixed_categories_json(order_type: OrderType, categories: &[String]) -> Option<String> {
    if order_type == OrderType::Mixed && !categories.is_empty() {
        serde_json::to_string(categories).ok()
    } else {
        None
    }
}
