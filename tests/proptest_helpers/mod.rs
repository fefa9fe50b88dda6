#![allow(dead_code)]

use std::collections::BTreeSet;

use detoverlay::ir::{
    CanonicalRect, DetectionItem, ItemSet, LineItem, LineStyle, Point, Rect, TextItem,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const CATEGORIES: [&str; 8] = [
    "dimension",
    "gdt",
    "datum",
    "note",
    "valve",
    "signal",
    "title_block",
    "mystery",
];

/// Categories that must survive encoding byte for byte.
pub const AWKWARD_CATEGORIES: [&str; 6] = [
    "",
    "  ",
    " gdt ",
    "\tnote\n",
    "a<b&c>",
    "\"quoted\" 'single'",
];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Whole-pixel rectangles fully inside a `width` x `height` image.
pub fn arb_rect(width: u32, height: u32) -> impl Strategy<Value = CanonicalRect> {
    (0..width.saturating_sub(1), 0..height.saturating_sub(1)).prop_flat_map(move |(x, y)| {
        (Just(x), Just(y), 1..=(width - x), 1..=(height - y))
            .prop_map(|(x, y, w, h)| {
                Rect::new(f64::from(x), f64::from(y), f64::from(w), f64::from(h))
            })
    })
}

pub fn arb_category() -> impl Strategy<Value = String> {
    let mut categories = CATEGORIES.to_vec();
    categories.extend(AWKWARD_CATEGORIES);
    prop::sample::select(categories).prop_map(|category| category.to_string())
}

/// Raw ids that may be empty, padded, look generated, or carry markup.
/// Not unique on their own; see [`unique_ids`].
pub fn arb_raw_id() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "d", "7", " ", "\t", "<", ">", "&", "\"", "'", "ø", "det-0", "x-1", "-",
        ]),
        0..4,
    )
    .prop_map(|parts| parts.concat())
}

/// Keeps the first use of every raw id and suffixes repeats with `#<index>`.
/// Raw ids never contain `#`, so the result has no duplicates.
pub fn unique_ids(raw: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, id)| {
            if seen.insert(id.clone()) {
                id
            } else {
                format!("{id}#{idx}")
            }
        })
        .collect()
}

/// Labels drawn from a hostile alphabet: markup characters, quotes,
/// whitespace escapes and non-ASCII.
pub fn arb_label() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "a", "Z", "7", " ", "<", ">", "&", "\"", "'", "\n", "\t", "ø", "⌀", "±", "=", ";",
            "/", "script", "&amp;", "]]>",
        ]),
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

/// Confidences with two decimals, so percentages format predictably.
pub fn arb_confidence() -> impl Strategy<Value = f64> {
    (0u32..=100).prop_map(|c| f64::from(c) / 100.0)
}

/// Detections with unique, awkward ids.
pub fn arb_detections(
    width: u32,
    height: u32,
    max_items: usize,
) -> impl Strategy<Value = Vec<DetectionItem>> {
    prop::collection::vec(
        (
            arb_raw_id(),
            arb_rect(width, height),
            arb_category(),
            arb_label(),
            arb_confidence(),
        ),
        0..=max_items,
    )
    .prop_map(|entries| {
        let (raw_ids, rest): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .map(|(id, rect, category, label, confidence)| {
                (id, (rect, category, label, confidence))
            })
            .unzip();
        unique_ids(raw_ids)
            .into_iter()
            .zip(rest)
            .map(|(id, (rect, category, label, confidence))| {
                DetectionItem::new(id, rect, category, label).with_confidence(confidence)
            })
            .collect()
    })
}

pub fn arb_line_style() -> impl Strategy<Value = LineStyle> {
    prop::sample::select(vec![
        LineStyle::Solid,
        LineStyle::Dashed,
        LineStyle::Dotted,
        LineStyle::Chain,
        LineStyle::DoubleChain,
    ])
}

pub fn arb_item_set(
    width: u32,
    height: u32,
    max_items: usize,
) -> impl Strategy<Value = ItemSet> {
    let lines = prop::collection::vec(
        (
            arb_raw_id(),
            (0..width, 0..height),
            (0..width, 0..height),
            arb_category(),
            arb_line_style(),
        ),
        0..=max_items,
    );
    let texts = prop::collection::vec(
        (
            arb_raw_id(),
            (0..width, 0..height),
            "[A-Za-z0-9][A-Za-z0-9 ]{0,7}",
            arb_category(),
        ),
        0..=max_items,
    );

    (arb_detections(width, height, max_items), lines, texts).prop_map(
        |(detections, lines, texts)| {
            let line_ids = unique_ids(lines.iter().map(|line| line.0.clone()).collect());
            let text_ids = unique_ids(texts.iter().map(|text| text.0.clone()).collect());
            ItemSet {
                detections,
                lines: lines
                    .into_iter()
                    .zip(line_ids)
                    .map(|((_, (x1, y1), (x2, y2), category, style), id)| {
                        LineItem::new(
                            id,
                            Point::new(f64::from(x1), f64::from(y1)),
                            Point::new(f64::from(x2), f64::from(y2)),
                            category,
                        )
                        .with_style(style)
                    })
                    .collect(),
                texts: texts
                    .into_iter()
                    .zip(text_ids)
                    .map(|((_, (x, y), text, category), id)| {
                        let position = Point::new(f64::from(x), f64::from(y));
                        TextItem::new(id, position, text, category)
                    })
                    .collect(),
            }
        },
    )
}
