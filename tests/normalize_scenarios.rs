use detoverlay::ir::io_payload::from_payload_str;
use detoverlay::ir::normalize::four_values_are_corners;
use detoverlay::ir::{normalize, LineStyle, Rect};
use proptest::prelude::*;
use serde_json::{json, Value};

mod common;
mod proptest_helpers;

fn rect_of(items: &detoverlay::ir::ItemSet, id: &str) -> Rect<detoverlay::ir::Pixel> {
    items
        .detections
        .iter()
        .find(|item| item.id.as_str() == id)
        .unwrap_or_else(|| panic!("missing detection {id}"))
        .rect
}

#[test]
fn mixed_payload_normalizes_every_encoding() {
    let items = from_payload_str(common::MIXED_PAYLOAD, 800, 600).expect("parse payload");

    assert_eq!(items.detections.len(), 5, "the broken bbox is dropped");
    assert_eq!(rect_of(&items, "poly"), Rect::new(100.0, 100.0, 80.0, 30.0));
    assert_eq!(rect_of(&items, "corners"), Rect::new(300.0, 200.0, 120.0, 60.0));
    assert_eq!(rect_of(&items, "sized"), Rect::new(500.0, 50.0, 60.0, 40.0));
    assert_eq!(rect_of(&items, "stringly"), Rect::new(40.0, 400.0, 30.0, 30.0));
    assert_eq!(rect_of(&items, "fraction"), Rect::new(400.0, 300.0, 160.0, 120.0));

    let poly = &items.detections[0];
    assert_eq!(poly.label, "25.4");
    assert_eq!(poly.category, "dimension");
    assert_eq!(items.detections[1].category, "gdt");

    assert_eq!(items.lines.len(), 1);
    assert_eq!(items.lines[0].style, LineStyle::Dashed);
    assert_eq!(items.lines[0].category, "leader");
    assert_eq!(items.texts[0].text, "SECTION A-A");
}

#[test]
fn polygon_reduces_to_its_bounds() {
    let rect = normalize(&json!([[10, 10], [50, 10], [50, 40], [10, 40]]), 100.0, 100.0, false);
    assert_eq!(rect, Some(Rect::new(10.0, 10.0, 40.0, 30.0)));

    let rect = normalize(
        &json!([{"x": 5, "y": 60}, {"x": 1, "y": 2}, {"x": 9, "y": 30}]),
        100.0,
        100.0,
        false,
    );
    assert_eq!(rect, Some(Rect::new(1.0, 2.0, 8.0, 58.0)));
}

#[test]
fn four_values_disambiguate_corners_from_size() {
    assert_eq!(
        normalize(&json!([100, 100, 300, 300]), 1000.0, 1000.0, false),
        Some(Rect::new(100.0, 100.0, 200.0, 200.0))
    );
    assert_eq!(
        normalize(&json!([100, 100, 30, 30]), 1000.0, 1000.0, false),
        Some(Rect::new(100.0, 100.0, 30.0, 30.0))
    );
    // Ambiguous near the origin: read as a size.
    assert!(!four_values_are_corners(10.0, 10.0, 15.0, 15.0));
    assert!(four_values_are_corners(10.0, 10.0, 25.0, 12.0));
}

#[test]
fn fractional_geometry_outside_unit_range_is_rejected() {
    assert_eq!(normalize(&json!([0.2, 0.2, 1.5, 0.1]), 100.0, 100.0, true), None);
    assert_eq!(normalize(&json!([0.2, 0.2, 0.1, 0.1]), 0.0, 100.0, true), None);
    assert_eq!(
        normalize(&json!({"x": 0.25, "y": 0.5, "width": 0.5, "height": 0.25}), 400.0, 200.0, true),
        Some(Rect::new(100.0, 100.0, 200.0, 50.0))
    );
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        (-1e6f64..1e6).prop_map(|n| json!(n)),
        "[ -~]{0,12}".prop_map(Value::String),
        Just(json!("[1, 2, 3, 4]")),
        Just(json!("NaN")),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(
                prop::sample::select(vec![
                    "x", "y", "width", "height", "xmin", "ymin", "xmax", "ymax", "x1", "y1", "x2",
                    "y2", "other"
                ]),
                inner,
                0..5
            )
            .prop_map(|map| Value::Object(
                map.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
            )),
        ]
    })
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn normalization_is_total(
        raw in arb_json(),
        normalized in any::<bool>(),
        w in 0.0f64..5000.0,
        h in 0.0f64..5000.0,
    ) {
        if let Some(rect) = normalize(&raw, w, h, normalized) {
            prop_assert!(rect.is_finite());
            prop_assert!(rect.width >= 0.0 && rect.height >= 0.0);
        }
    }

    #[test]
    fn polygon_bounds_contain_every_vertex(
        points in prop::collection::vec((-1000i32..1000, -1000i32..1000), 2..12),
    ) {
        let raw = Value::Array(points.iter().map(|(x, y)| json!([x, y])).collect());
        let rect = normalize(&raw, 2000.0, 2000.0, false).expect("polygon normalizes");
        for (x, y) in points {
            let (x, y) = (f64::from(x), f64::from(y));
            prop_assert!(rect.x <= x && x <= rect.right());
            prop_assert!(rect.y <= y && y <= rect.bottom());
        }
    }
}
