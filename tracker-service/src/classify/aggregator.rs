//! Line item aggregation.
//!
//! PDF extraction and manual entry both produce noisy rows: the same item
//! split across pages, numbers with thousands separators, blank quantities.
//! Aggregation collapses duplicates by code (falling back to normalized
//! description) before classification so one billable item persists as one
//! row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw line item as produced by extraction or a manual entry form.
///
/// Numeric fields arrive as text and may be blank, comma-grouped or
/// garbage; parsing failures fall back to documented defaults rather than
/// erroring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedLineItem {
    pub code: Option<String>,
    pub description: String,
    pub qty: Option<String>,
    pub unit: Option<String>,
    pub rate: Option<String>,
    pub value: Option<String>,
}

impl ExtractedLineItem {
    /// Build items from the parallel `item_*[]` form arrays (indexed
    /// positionally; rows with a blank description are skipped, trailing
    /// arrays may be shorter).
    pub fn from_parallel_arrays(
        descriptions: &[String],
        qtys: &[String],
        prices: &[String],
        codes: &[String],
        units: &[String],
        values: &[String],
    ) -> Vec<ExtractedLineItem> {
        let field = |row: &[String], idx: usize| -> Option<String> {
            row.get(idx)
                .map(|raw| raw.trim())
                .filter(|raw| !raw.is_empty())
                .map(str::to_string)
        };

        descriptions
            .iter()
            .enumerate()
            .filter(|(_, description)| !description.trim().is_empty())
            .map(|(idx, description)| ExtractedLineItem {
                code: field(codes, idx),
                description: description.trim().to_string(),
                qty: field(qtys, idx),
                unit: field(units, idx),
                rate: field(prices, idx),
                value: field(values, idx),
            })
            .collect()
    }
}

/// One collapsed billable item, priced and ready for classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedLineItem {
    pub code: Option<String>,
    pub description: String,
    pub qty: Decimal,
    pub unit: Option<String>,
    pub unit_price: Decimal,
}

/// Parse a money/quantity string, tolerating thousands separators.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.trim().replace(',', "").parse::<Decimal>().ok()
}

struct Accumulator {
    code: Option<String>,
    description: String,
    qty: Decimal,
    unit: Option<String>,
    rates: Vec<Decimal>,
    values: Vec<Decimal>,
}

/// Collapse duplicate extracted items into one entry per distinct key.
///
/// Key is the trimmed code when present, else the lower-cased
/// whitespace-collapsed description. Quantities sum (unparsable or
/// non-positive quantities count as 1); the unit price prefers the mean of
/// the observed rates and only falls back to summed line values divided by
/// quantity when no rate was extracted. The result is insertion-ordered,
/// order-insensitive in content, and a fixed point of re-aggregation.
pub fn aggregate_line_items(items: &[ExtractedLineItem]) -> Vec<AggregatedLineItem> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Accumulator> = HashMap::new();

    for item in items {
        let description = {
            let trimmed = item.description.trim();
            if trimmed.is_empty() { "Item" } else { trimmed }.to_string()
        };
        let code = item
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);

        let normalized_description = description
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let key = code.clone().unwrap_or(normalized_description);

        let qty = item
            .qty
            .as_deref()
            .and_then(parse_decimal)
            .filter(|qty| *qty > Decimal::ZERO)
            .unwrap_or(Decimal::ONE);
        let unit = item
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|unit| !unit.is_empty())
            .map(str::to_string);
        let rate = item
            .rate
            .as_deref()
            .and_then(parse_decimal)
            .filter(|rate| !rate.is_zero());
        let value = item
            .value
            .as_deref()
            .and_then(parse_decimal)
            .filter(|value| !value.is_zero());

        let entry = buckets.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Accumulator {
                code,
                description,
                qty: Decimal::ZERO,
                unit: None,
                rates: Vec::new(),
                values: Vec::new(),
            }
        });

        entry.qty += qty;
        if entry.unit.is_none() {
            entry.unit = unit;
        }
        if let Some(rate) = rate {
            entry.rates.push(rate);
        }
        if let Some(value) = value {
            entry.values.push(value);
        }
    }

    order
        .into_iter()
        .filter_map(|key| buckets.remove(&key))
        .map(|entry| {
            let final_qty = if entry.qty > Decimal::ZERO {
                entry.qty
            } else {
                Decimal::ONE
            };

            let unit_price = if !entry.rates.is_empty() {
                let sum: Decimal = entry.rates.iter().sum();
                sum / Decimal::from(entry.rates.len())
            } else if !entry.values.is_empty() {
                let sum: Decimal = entry.values.iter().sum();
                sum / final_qty
            } else {
                Decimal::ZERO
            };

            AggregatedLineItem {
                code: entry.code,
                description: entry.description,
                qty: final_qty,
                unit: entry.unit,
                unit_price,
            }
        })
        .collect()
}
