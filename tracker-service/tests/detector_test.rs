//! Order-type detection tests for tracker-service.

mod common;

use common::{codes, registry};
use tracker_service::classify::{
    combine_detections, detect_order_type, mixed_categories_json, CodeRegistry,
    StaticCodeRegistry,
};
use tracker_service::models::{LineType, OrderType};

#[test]
fn category_normalization_is_total() {
    assert_eq!(LineType::from_category(None), LineType::Unspecified);
    assert_eq!(LineType::from_category(Some("")), LineType::Unspecified);
    assert_eq!(LineType::from_category(Some("labour")), LineType::Labour);
    assert_eq!(LineType::from_category(Some("LABOUR")), LineType::Labour);
    assert_eq!(LineType::from_category(Some("  Labour  ")), LineType::Labour);
    assert_eq!(
        LineType::from_category(Some("Tyre Service")),
        LineType::Service
    );
    assert_eq!(
        LineType::from_category(Some("tyre service / makill")),
        LineType::Service
    );
    assert_eq!(LineType::from_category(Some("service")), LineType::Service);
    // Historical catch-all: anything else routes to labour, even text that
    // looks like a product.
    assert_eq!(LineType::from_category(Some("Brake Pads")), LineType::Labour);
    assert_eq!(LineType::from_category(Some(" ")), LineType::Labour);
}

#[test]
fn line_type_wire_names_round_trip() {
    for line_type in [
        LineType::Labour,
        LineType::Sales,
        LineType::Service,
        LineType::Unspecified,
    ] {
        assert_eq!(LineType::from_string(line_type.as_str()), line_type);
    }
    assert_eq!(LineType::from_string("weird"), LineType::Unspecified);
}

#[tokio::test]
async fn empty_code_list_is_unspecified() {
    let detection = detect_order_type(&[], &registry())
        .await
        .expect("detection never fails on empty input");

    assert_eq!(detection.order_type, OrderType::Unspecified);
    assert!(detection.categories.is_empty());
    assert!(detection.mapping.mapped.is_empty());
    assert!(detection.mapping.unmapped.is_empty());
}

#[tokio::test]
async fn blank_codes_clean_to_sales() {
    // Distinct from the empty-input branch above, deliberately.
    let detection = detect_order_type(&codes(&["   ", ""]), &registry())
        .await
        .expect("detection never fails on blank input");

    assert_eq!(detection.order_type, OrderType::Sales);
    assert!(detection.categories.is_empty());
    assert!(detection.mapping.mapped.is_empty());
}

#[tokio::test]
async fn single_mapped_code_names_the_type() {
    let detection = detect_order_type(&codes(&["L100"]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Labour);
    assert_eq!(detection.categories, vec!["labour".to_string()]);
    assert_eq!(
        detection.mapping.mapped.get("L100"),
        Some(&"labour".to_string())
    );
    assert_eq!(detection.mapping.order_types_found, vec![LineType::Labour]);
}

#[tokio::test]
async fn mixed_categories_detected_across_codes() {
    let detection = detect_order_type(&codes(&["L100", "T200"]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Mixed);
    assert_eq!(
        detection.categories,
        vec!["labour".to_string(), "tyre service".to_string()]
    );
    assert_eq!(
        detection.mapping.order_types_found,
        vec![LineType::Labour, LineType::Service]
    );
    assert!(detection.mapping.unmapped.is_empty());
}

#[tokio::test]
async fn unmapped_codes_are_sales() {
    let detection = detect_order_type(&codes(&["UNKNOWN1"]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Sales);
    assert_eq!(detection.categories, vec!["sales".to_string()]);
    assert_eq!(detection.mapping.unmapped, vec!["UNKNOWN1".to_string()]);
    assert!(detection.mapping.mapped.is_empty());
}

#[tokio::test]
async fn inactive_registry_entries_do_not_match() {
    let detection = detect_order_type(&codes(&["X900"]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Sales);
    assert_eq!(detection.mapping.unmapped, vec!["X900".to_string()]);
}

#[tokio::test]
async fn codes_are_trimmed_and_deduplicated() {
    let detection = detect_order_type(&codes(&[" L100 ", "L100", "L100  "]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Labour);
    assert_eq!(detection.mapping.mapped.len(), 1);
}

#[tokio::test]
async fn mapped_and_unmapped_mix_to_mixed() {
    let detection = detect_order_type(&codes(&["L100", "PRODUCT9"]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Mixed);
    assert_eq!(
        detection.categories,
        vec!["labour".to_string(), "sales".to_string()]
    );
    assert_eq!(detection.mapping.unmapped, vec!["PRODUCT9".to_string()]);
}

#[tokio::test]
async fn registry_lookup_contract_on_empty_input() {
    let looked_up = registry().lookup(&[]).await.expect("lookup");
    assert!(looked_up.is_empty());
}

#[tokio::test]
async fn same_category_from_two_codes_is_not_mixed() {
    let detection = detect_order_type(&codes(&["L100", "L200"]), &registry())
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Labour);
    assert_eq!(detection.categories, vec!["labour".to_string()]);
}

#[tokio::test]
async fn order_type_combines_across_invoices() {
    let registry = registry();
    let labour_only = detect_order_type(&codes(&["L100"]), &registry)
        .await
        .expect("detection");
    let sales_only = detect_order_type(&codes(&["PRODUCT9"]), &registry)
        .await
        .expect("detection");

    let (combined, categories) = combine_detections(&[labour_only.clone(), sales_only]);
    assert_eq!(combined, OrderType::Mixed);
    assert_eq!(categories, vec!["labour".to_string(), "sales".to_string()]);

    let (single, _) = combine_detections(&[labour_only]);
    assert_eq!(single, OrderType::Labour);

    let (empty, categories) = combine_detections(&[]);
    assert_eq!(empty, OrderType::Sales);
    assert!(categories.is_empty());
}

#[tokio::test]
async fn mixed_categories_payload_only_for_mixed_orders() {
    let categories = vec!["labour".to_string(), "sales".to_string()];

    let payload = mixed_categories_json(OrderType::Mixed, &categories)
        .expect("mixed orders carry a payload");
    assert_eq!(payload, r#"["labour","sales"]"#);

    assert!(mixed_categories_json(OrderType::Labour, &categories).is_none());
    assert!(mixed_categories_json(OrderType::Mixed, &[]).is_none());
}

#[tokio::test]
async fn detection_with_empty_registry_still_resolves() {
    let empty = StaticCodeRegistry::new();
    let detection = detect_order_type(&codes(&["ANY"]), &empty)
        .await
        .expect("detection");

    assert_eq!(detection.order_type, OrderType::Sales);
    assert_eq!(detection.mapping.unmapped, vec!["ANY".to_string()]);
}

#[test]
fn mixed_display_joins_component_names() {
    assert_eq!(
        OrderType::Mixed.display_with_components(&[LineType::Sales, LineType::Labour]),
        "Labour and Sales"
    );
    assert_eq!(
        OrderType::Mixed.display_with_components(&[LineType::Labour, LineType::Service]),
        "Labour and Service"
    );
    assert_eq!(
        OrderType::Service.display_with_components(&[LineType::Service]),
        "Service"
    );
    assert_eq!(OrderType::Mixed.display_with_components(&[]), "Mixed");
}
