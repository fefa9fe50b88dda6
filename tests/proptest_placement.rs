use detoverlay::ir::{CanonicalRect, Rect};
use detoverlay::placement::{place, LabelPlacer, LabelRegion, Size};
use proptest::prelude::*;

mod proptest_helpers;

fn in_bounds(region: &LabelRegion, canvas: Size) -> bool {
    region.x >= 0.0
        && region.y >= 0.0
        && region.right() <= canvas.width
        && region.bottom() <= canvas.height
}

fn arb_anchor() -> impl Strategy<Value = CanonicalRect> {
    (-500.0f64..3500.0, -500.0f64..3500.0, 0.0f64..800.0, 0.0f64..800.0)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn placed_labels_stay_on_canvas(
        canvas_w in 1u16..3000,
        canvas_h in 1u16..3000,
        label_w in 0u16..4000,
        label_h in 0u16..400,
        gap in 0u8..16,
        anchors in prop::collection::vec(arb_anchor(), 1..40),
    ) {
        let canvas = Size::new(f64::from(canvas_w), f64::from(canvas_h));
        let mut placer = LabelPlacer::new(canvas, f64::from(gap));
        for anchor in &anchors {
            let region = placer.place(anchor, Size::new(f64::from(label_w), f64::from(label_h)));
            prop_assert!(in_bounds(&region, canvas), "{region:?} escapes {canvas:?}");
        }
    }

    #[test]
    fn sparse_labels_never_overlap(
        cells in prop::collection::btree_set((0u32..10, 0u32..10), 1..30),
        box_size in 8u32..40,
        label_w in 10u32..60,
        label_h in 8u32..20,
    ) {
        // One anchor per 200px cell, labels much smaller than the spacing.
        let canvas = Size::new(2000.0, 2000.0);
        let mut placer = LabelPlacer::new(canvas, 4.0);
        let label = Size::new(f64::from(label_w), f64::from(label_h));

        for (col, row) in &cells {
            let anchor = Rect::new(
                f64::from(col * 200 + 80),
                f64::from(row * 200 + 80),
                f64::from(box_size),
                f64::from(box_size),
            );
            placer.place(&anchor, label);
        }

        let used = placer.used();
        for (i, a) in used.iter().enumerate() {
            for b in &used[i + 1..] {
                prop_assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn placement_is_deterministic(
        anchor in arb_anchor(),
        used in prop::collection::vec(arb_anchor(), 0..10),
    ) {
        let canvas = Size::new(1200.0, 900.0);
        let label = Size::new(64.0, 16.0);
        let first = place(&anchor, label, canvas, &used, 4.0);
        prop_assert_eq!(first, place(&anchor, label, canvas, &used, 4.0));
    }
}
