//! Revenue attribution by order type.

use crate::models::LineItem;
use rust_decimal::Decimal;
use serde::Serialize;

/// Revenue totals bucketed by persisted line-item order type.
///
/// Decimal fields serialize as strings, so dashboard JSON stays safe for
/// arbitrary-precision money.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevenueBucket {
    pub sales: Decimal,
    pub service: Decimal,
    pub labour: Decimal,
    pub unknown: Decimal,
    pub total: Decimal,
    pub count: i64,
}

impl RevenueBucket {
    /// Sum `line_total + tax_amount` per item into the bucket matching its
    /// persisted order type. Tags outside the known buckets — including
    /// `unspecified` and anything malformed — land in `unknown`. A pure
    /// reduction: never fails, empty input yields the zero bucket.
    ///
    /// `count` stays zero here; the reporting query sets it to the number
    /// of invoices analyzed, which this reduction cannot know.
    pub fn from_line_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a LineItem>,
    {
        let mut bucket = RevenueBucket::default();

        for item in items {
            let line_value = item.line_total + item.tax_amount;
            match item.order_type.as_str() {
                "sales" => bucket.sales += line_value,
                "service" => bucket.service += line_value,
                "labour" => bucket.labour += line_value,
                _ => bucket.unknown += line_value,
            }
        }

        bucket.total = bucket.sales + bucket.service + bucket.labour + bucket.unknown;
        bucket
    }

    /// Attach the number of invoices the report covered.
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }
}
