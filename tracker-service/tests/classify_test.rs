//! End-to-end classification pipeline tests for tracker-service.

mod common;

use common::{dec, item, registry};
use rust_decimal::Decimal;
use tracker_service::classify::{classify_invoice, StaticCodeRegistry};
use tracker_service::models::{finalize_totals, CreateLineItem, LineType, OrderType};

#[tokio::test]
async fn mixed_invoice_classifies_items_and_order() {
    // One mapped labour code plus an uncoded product line.
    let registry = StaticCodeRegistry::new().with_entry("L100", "labour");
    let items = vec![
        item(Some("L100"), "Oil filter replace", Some("1"), None, Some("50000")),
        item(None, "Tire X", Some("2"), Some("75000"), None),
    ];

    let classified = classify_invoice(&items, &registry).await.expect("classify");

    assert_eq!(classified.line_items.len(), 2);

    let labour = &classified.line_items[0];
    assert_eq!(labour.order_type, LineType::Labour);
    assert_eq!(labour.line_total, dec("50000"));

    let sales = &classified.line_items[1];
    assert_eq!(sales.order_type, LineType::Sales);
    assert_eq!(sales.line_total, dec("150000"));

    assert_eq!(classified.detection.order_type, OrderType::Mixed);
    assert_eq!(
        classified.detection.categories,
        vec!["labour".to_string(), "sales".to_string()]
    );
}

#[tokio::test]
async fn no_items_yields_unspecified_and_nothing_to_persist() {
    let classified = classify_invoice(&[], &registry()).await.expect("classify");

    assert!(classified.line_items.is_empty());
    assert_eq!(classified.detection.order_type, OrderType::Unspecified);
}

#[tokio::test]
async fn all_unmapped_codes_classify_as_sales() {
    let items = vec![
        item(Some("PRODUCT1"), "Floor mats", Some("1"), Some("300"), None),
        item(Some("PRODUCT2"), "Wiper blades", Some("2"), Some("150"), None),
    ];

    let classified = classify_invoice(&items, &registry()).await.expect("classify");

    assert_eq!(classified.detection.order_type, OrderType::Sales);
    assert!(classified
        .line_items
        .iter()
        .all(|line| line.order_type == LineType::Sales));
}

#[tokio::test]
async fn uncoded_items_alone_classify_as_sales() {
    let items = vec![item(None, "Tire X", Some("2"), Some("75000"), None)];

    let classified = classify_invoice(&items, &registry()).await.expect("classify");

    assert_eq!(classified.detection.order_type, OrderType::Sales);
    assert_eq!(classified.detection.categories, vec!["sales".to_string()]);
}

#[tokio::test]
async fn item_type_is_a_pure_function_of_its_code() {
    let items = vec![
        item(Some("L100"), "Engine work", Some("1"), Some("100"), None),
        item(Some("L200"), "Gearbox work", Some("1"), Some("200"), None),
    ];

    let first = classify_invoice(&items, &registry()).await.expect("classify");
    let second = classify_invoice(&items, &registry()).await.expect("classify");

    for (a, b) in first.line_items.iter().zip(second.line_items.iter()) {
        assert_eq!(a.order_type, b.order_type);
    }
    assert_eq!(first.detection.order_type, OrderType::Labour);
}

#[tokio::test]
async fn service_and_labour_codes_make_a_mixed_order() {
    let items = vec![
        item(Some("L100"), "Engine work", Some("1"), Some("100"), None),
        item(Some("T200"), "Wheel balance", Some("1"), Some("50"), None),
    ];

    let classified = classify_invoice(&items, &registry()).await.expect("classify");

    assert_eq!(classified.detection.order_type, OrderType::Mixed);
    assert_eq!(classified.line_items[0].order_type, LineType::Labour);
    assert_eq!(classified.line_items[1].order_type, LineType::Service);
}

fn persisted(line_total: &str, tax_amount: &str) -> CreateLineItem {
    CreateLineItem {
        code: None,
        description: "Item".to_string(),
        quantity: Decimal::ONE,
        unit: None,
        unit_price: dec(line_total),
        tax_rate: Decimal::ZERO,
        tax_amount: dec(tax_amount),
        line_total: dec(line_total),
        order_type: LineType::Sales,
    }
}

#[test]
fn missing_subtotal_is_recovered_from_line_items() {
    let items = vec![persisted("100", "5"), persisted("200", "10")];

    let totals = finalize_totals(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, &items);

    assert_eq!(totals.subtotal, dec("300"));
    assert_eq!(totals.tax_amount, dec("15"));
    assert_eq!(totals.total_amount, dec("315"));
}

#[test]
fn extracted_amounts_stay_authoritative() {
    let items = vec![persisted("100", "0")];

    let totals = finalize_totals(dec("500"), dec("90"), dec("590"), &items);

    assert_eq!(totals.subtotal, dec("500"));
    assert_eq!(totals.tax_amount, dec("90"));
    assert_eq!(totals.total_amount, dec("590"));
}

#[test]
fn missing_total_falls_back_to_subtotal_plus_tax() {
    let totals = finalize_totals(dec("500"), dec("90"), Decimal::ZERO, &[]);
    assert_eq!(totals.total_amount, dec("590"));

    let empty = finalize_totals(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, &[]);
    assert_eq!(empty.subtotal, Decimal::ZERO);
    assert_eq!(empty.total_amount, Decimal::ZERO);
}
