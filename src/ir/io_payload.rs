//! Upstream detection payload reader.
//!
//! Accepts either a bare array of detections or an object with `detections`,
//! `lines` and `texts` arrays. Every geometry field goes through the
//! normalizer; entries whose geometry cannot be normalized are dropped so a
//! single bad item never blocks the rest of the pass.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::ids::ItemId;
use super::model::{clamp_confidence, DetectionItem, ItemSet, LineItem, LineStyle, TextItem};
use super::normalize::{normalize, normalize_point};
use crate::error::OverlayError;

/// Fallback category for text annotations that do not name one.
pub const DEFAULT_TEXT_CATEGORY: &str = "text";

// ============================================================================
// Payload schema types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Bare(Vec<Value>),
    Structured(RawStructured),
}

#[derive(Debug, Default, Deserialize)]
struct RawStructured {
    #[serde(default)]
    detections: Vec<Value>,
    #[serde(default)]
    lines: Vec<Value>,
    #[serde(default)]
    texts: Vec<Value>,
    #[serde(default)]
    normalized: bool,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "class")]
    class_name: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    bbox: Value,
    #[serde(default, alias = "extracted_text")]
    value: Option<Value>,
    #[serde(default)]
    normalized: Option<bool>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawLine {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    start: Value,
    #[serde(default)]
    end: Value,
    #[serde(default, alias = "category")]
    line_type: Option<String>,
    #[serde(default, alias = "style")]
    line_style: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    position: Value,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a detection payload file and normalizes it against the image size.
pub fn read_payload(
    path: &Path,
    image_width: u32,
    image_height: u32,
) -> Result<ItemSet, OverlayError> {
    let file = File::open(path).map_err(OverlayError::Io)?;
    let reader = BufReader::new(file);

    let payload: RawPayload =
        serde_json::from_reader(reader).map_err(|source| OverlayError::PayloadParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(payload_to_items(payload, image_width, image_height))
}

/// Parses a detection payload from a string.
pub fn from_payload_str(
    json: &str,
    image_width: u32,
    image_height: u32,
) -> Result<ItemSet, OverlayError> {
    let payload: RawPayload =
        serde_json::from_str(json).map_err(|source| OverlayError::PayloadParse {
            path: Path::new("<string>").to_path_buf(),
            source,
        })?;
    Ok(payload_to_items(payload, image_width, image_height))
}

/// Parses a detection payload from bytes.
pub fn from_payload_slice(
    bytes: &[u8],
    image_width: u32,
    image_height: u32,
) -> Result<ItemSet, OverlayError> {
    let payload: RawPayload =
        serde_json::from_slice(bytes).map_err(|source| OverlayError::PayloadParse {
            path: Path::new("<bytes>").to_path_buf(),
            source,
        })?;
    Ok(payload_to_items(payload, image_width, image_height))
}

// ============================================================================
// Conversion: payload -> canonical items
// ============================================================================

fn payload_to_items(payload: RawPayload, image_width: u32, image_height: u32) -> ItemSet {
    let raw = match payload {
        RawPayload::Bare(detections) => RawStructured {
            detections,
            ..Default::default()
        },
        RawPayload::Structured(structured) => structured,
    };

    let dims = (f64::from(image_width), f64::from(image_height));
    let mut items = ItemSet::new();

    for (idx, value) in raw.detections.into_iter().enumerate() {
        match parse_detection(value, idx, dims, raw.normalized) {
            Some(item) => items.detections.push(item),
            None => log::debug!("dropping detection[{idx}]: unrecognized geometry"),
        }
    }

    for (idx, value) in raw.lines.into_iter().enumerate() {
        match parse_line(value, idx, dims, raw.normalized) {
            Some(item) => items.lines.push(item),
            None => log::debug!("dropping line[{idx}]: unrecognized endpoints"),
        }
    }

    for (idx, value) in raw.texts.into_iter().enumerate() {
        match parse_text(value, idx, dims, raw.normalized) {
            Some(item) => items.texts.push(item),
            None => log::debug!("dropping text[{idx}]: unrecognized position"),
        }
    }

    dedupe_ids(&mut items);

    log::debug!(
        "normalized payload into {} detections, {} lines, {} texts",
        items.detections.len(),
        items.lines.len(),
        items.texts.len()
    );

    items
}

fn parse_detection(
    value: Value,
    idx: usize,
    (width, height): (f64, f64),
    normalized: bool,
) -> Option<DetectionItem> {
    let raw: RawDetection = serde_json::from_value(value).ok()?;
    let rect = normalize(&raw.bbox, width, height, raw.normalized.unwrap_or(normalized))?;

    let category = raw
        .class_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    // OCR-linked detections caption with their extracted text.
    let label = raw
        .value
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| category.clone());

    let metadata = raw
        .extra
        .iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|text| (key.clone(), text)))
        .collect();

    Some(DetectionItem {
        id: item_id(raw.id.as_ref(), "det", idx),
        rect,
        category,
        label,
        confidence: clamp_confidence(raw.confidence.unwrap_or(1.0)),
        metadata,
    })
}

fn parse_line(
    value: Value,
    idx: usize,
    (width, height): (f64, f64),
    normalized: bool,
) -> Option<LineItem> {
    let raw: RawLine = serde_json::from_value(value).ok()?;
    let start = normalize_point(&raw.start, width, height, normalized)?;
    let end = normalize_point(&raw.end, width, height, normalized)?;

    let category = raw
        .line_type
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "line".to_string());
    let style = raw
        .line_style
        .as_deref()
        .map(LineStyle::parse)
        .unwrap_or_default();

    let mut item = LineItem::new(item_id(raw.id.as_ref(), "line", idx), start, end, category)
        .with_style(style);
    if let Some(confidence) = raw.confidence {
        item = item.with_confidence(confidence);
    }
    Some(item)
}

fn parse_text(
    value: Value,
    idx: usize,
    (width, height): (f64, f64),
    normalized: bool,
) -> Option<TextItem> {
    let raw: RawText = serde_json::from_value(value).ok()?;
    let position = normalize_point(&raw.position, width, height, normalized)?;
    let text = raw.text.filter(|text| !text.is_empty())?;
    let category = raw
        .category
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TEXT_CATEGORY.to_string());

    Some(TextItem::new(
        item_id(raw.id.as_ref(), "text", idx),
        position,
        text,
        category,
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn item_id(raw: Option<&Value>, prefix: &str, idx: usize) -> ItemId {
    raw.and_then(scalar_to_string)
        .filter(|id| !id.is_empty())
        .map(ItemId::from)
        .unwrap_or_else(|| ItemId::generated(prefix, idx))
}

/// Makes ids unique across all item kinds, in payload order.
///
/// A taken id gets the first free `-N` suffix, so a generated `det-0` and an
/// explicit `det-0` never share a hit target.
fn dedupe_ids(items: &mut ItemSet) {
    let mut used = BTreeSet::new();
    let ids = items
        .detections
        .iter_mut()
        .map(|item| &mut item.id)
        .chain(items.lines.iter_mut().map(|item| &mut item.id))
        .chain(items.texts.iter_mut().map(|item| &mut item.id));

    for id in ids {
        if used.insert(id.as_str().to_string()) {
            continue;
        }
        let mut suffix = 1usize;
        let mut candidate = format!("{}-{suffix}", id.as_str());
        while used.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}-{suffix}", id.as_str());
        }
        log::debug!("duplicate id {:?} renamed to {candidate:?}", id.as_str());
        used.insert(candidate.clone());
        *id = ItemId::from(candidate);
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Rect;

    #[test]
    fn bare_array_payload_mixes_bbox_formats() {
        let json = r#"[
            {"class_name": "dimension", "confidence": 0.9, "bbox": [0, 0, 50, 50]},
            {"class": "gdt", "confidence": 0.8,
             "bbox": {"x": 100, "y": 100, "width": 20, "height": 20}},
            {"class_name": "note", "bbox": [[5, 5], [15, 5], [15, 15], [5, 15]]}
        ]"#;

        let items = from_payload_str(json, 640, 480).expect("parse payload");
        let rects: Vec<_> = items.detections.iter().map(|item| item.rect).collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(0.0, 0.0, 50.0, 50.0),
                Rect::new(100.0, 100.0, 20.0, 20.0),
                Rect::new(5.0, 5.0, 10.0, 10.0),
            ]
        );
        assert_eq!(items.detections[1].category, "gdt");
        assert_eq!(items.detections[2].confidence, 1.0);
        assert_eq!(items.detections[0].id.as_str(), "det-0");
    }

    #[test]
    fn malformed_detections_are_skipped() {
        let json = r#"{"detections": [
            {"class_name": "a", "bbox": "garbage"},
            {"class_name": "b", "bbox": [1, 2, 3, 4]},
            "not an object"
        ]}"#;

        let items = from_payload_str(json, 100, 100).expect("parse payload");
        assert_eq!(items.detections.len(), 1);
        assert_eq!(items.detections[0].id.as_str(), "det-1");
    }

    #[test]
    fn ocr_text_and_extra_fields_are_kept() {
        let json = r#"[{"id": 17, "class_name": "dimension", "bbox": [1, 1, 2, 2],
            "extracted_text": "Ø12.5", "page": 2, "verified": false, "nested": {"a": 1}}]"#;

        let items = from_payload_str(json, 100, 100).expect("parse payload");
        let item = &items.detections[0];
        assert_eq!(item.id.as_str(), "17");
        assert_eq!(item.label, "Ø12.5");
        assert_eq!(item.metadata.get("page"), Some(&"2".to_string()));
        assert_eq!(item.metadata.get("verified"), Some(&"false".to_string()));
        assert!(!item.metadata.contains_key("nested"));
    }

    #[test]
    fn lines_and_texts_are_normalized() {
        let json = r#"{
            "normalized": true,
            "lines": [
                {"start": {"x": 0, "y": 0}, "end": {"x": 0.5, "y": 1},
                 "line_type": "process", "line_style": "dashed", "confidence": 0.4},
                {"start": {"x": 0}, "end": "bad", "line_type": "signal"}
            ],
            "texts": [
                {"position": [0.25, 0.5], "text": "P-101"},
                {"position": [0.25, 0.5], "text": ""}
            ]
        }"#;

        let items = from_payload_str(json, 200, 100).expect("parse payload");
        assert_eq!(items.lines.len(), 1);
        let line = &items.lines[0];
        assert_eq!((line.end.x, line.end.y), (100.0, 100.0));
        assert_eq!(line.style, LineStyle::Dashed);
        assert_eq!(line.confidence, Some(0.4));

        assert_eq!(items.texts.len(), 1);
        assert_eq!(items.texts[0].category, DEFAULT_TEXT_CATEGORY);
        assert_eq!((items.texts[0].position.x, items.texts[0].position.y), (50.0, 50.0));
    }

    #[test]
    fn colliding_ids_are_made_unique() {
        let json = r#"{
            "detections": [
                {"bbox": [0, 0, 5, 5]},
                {"id": "det-0", "bbox": [10, 0, 5, 5]},
                {"id": "x", "bbox": [20, 0, 5, 5]},
                {"id": "x", "bbox": [30, 0, 5, 5]},
                {"id": "x-1", "bbox": [40, 0, 5, 5]}
            ],
            "lines": [{"id": "x", "start": [0, 0], "end": [9, 9]}],
            "texts": [
                {"position": [1, 1], "text": "A"},
                {"id": "text-0", "position": [2, 2], "text": "B"}
            ]
        }"#;

        let items = from_payload_str(json, 100, 100).expect("parse payload");
        let detection_ids: Vec<_> = items.detections.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(detection_ids, vec!["det-0", "det-0-1", "x", "x-1", "x-1-1"]);
        assert_eq!(items.lines[0].id.as_str(), "x-2");
        assert_eq!(items.texts[0].id.as_str(), "text-0");
        assert_eq!(items.texts[1].id.as_str(), "text-0-1");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            from_payload_str("{nope", 10, 10),
            Err(OverlayError::PayloadParse { .. })
        ));
    }
}
