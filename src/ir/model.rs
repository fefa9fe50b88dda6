//! Canonical item model.
//!
//! Every upstream payload is normalized into these types before anything is
//! drawn. Both renderers and the SVG decoder speak only this model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ids::ItemId;
use super::point::Point;
use super::rect::CanonicalRect;
use super::space::Pixel;

/// Everything drawn in one render pass.
///
/// An `ItemSet` is owned by the pass that built it and replaced wholesale
/// when new detection results arrive.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSet {
    #[serde(default)]
    pub detections: Vec<DetectionItem>,

    #[serde(default)]
    pub lines: Vec<LineItem>,

    #[serde(default)]
    pub texts: Vec<TextItem>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items across all three kinds.
    pub fn len(&self) -> usize {
        self.detections.len() + self.lines.len() + self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detections sorted by confidence (highest first), ties broken by id.
    ///
    /// This is the order in which labels claim their positions.
    pub fn detections_by_confidence(&self) -> Vec<&DetectionItem> {
        let mut sorted: Vec<&DetectionItem> = self.detections.iter().collect();
        sorted.sort_by(|left, right| {
            right
                .confidence
                .total_cmp(&left.confidence)
                .then_with(|| left.id.cmp(&right.id))
        });
        sorted
    }
}

/// A bounding-box annotation produced by a detector or OCR engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionItem {
    pub id: ItemId,

    /// Bounding box in pixel space.
    pub rect: CanonicalRect,

    /// Detection class, used for style and layer lookup.
    pub category: String,

    /// Caption text (class name or OCR text).
    pub label: String,

    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,

    /// Pass-through fields from the upstream payload.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl DetectionItem {
    /// Creates a detection with full confidence and no metadata.
    pub fn new(
        id: impl Into<ItemId>,
        rect: CanonicalRect,
        category: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rect,
            category: category.into(),
            label: label.into(),
            confidence: 1.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the confidence, clamped to `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Stroke pattern requested by a line detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Chain,
    DoubleChain,
}

impl LineStyle {
    /// Parses the upstream style name; anything unknown is drawn solid.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "dashed" | "dash" | "hidden" => LineStyle::Dashed,
            "dotted" | "dot" => LineStyle::Dotted,
            "chain" | "dash_dot" | "center" => LineStyle::Chain,
            "double_chain" | "dash_dot_dot" | "phantom" => LineStyle::DoubleChain,
            _ => LineStyle::Solid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineStyle::Solid => "solid",
            LineStyle::Dashed => "dashed",
            LineStyle::Dotted => "dotted",
            LineStyle::Chain => "chain",
            LineStyle::DoubleChain => "double_chain",
        }
    }

    /// Dash array for this style at the given render scale; empty means solid.
    pub fn dash_pattern(&self, scale: f64) -> Vec<f64> {
        let base: &[f64] = match self {
            LineStyle::Solid => &[],
            LineStyle::Dashed => &[8.0, 4.0],
            LineStyle::Dotted => &[2.0, 4.0],
            LineStyle::Chain => &[12.0, 4.0, 2.0, 4.0],
            LineStyle::DoubleChain => &[12.0, 4.0, 2.0, 4.0, 2.0, 4.0],
        };
        base.iter().map(|len| len * scale).collect()
    }
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line segment produced by a line detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ItemId,
    pub start: Point<Pixel>,
    pub end: Point<Pixel>,
    pub category: String,

    #[serde(default)]
    pub style: LineStyle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl LineItem {
    pub fn new(
        id: impl Into<ItemId>,
        start: Point<Pixel>,
        end: Point<Pixel>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            category: category.into(),
            style: LineStyle::Solid,
            confidence: None,
        }
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(clamp_confidence(confidence));
        self
    }
}

/// A free-standing text annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub id: ItemId,
    pub position: Point<Pixel>,
    pub text: String,
    pub category: String,
}

impl TextItem {
    pub fn new(
        id: impl Into<ItemId>,
        position: Point<Pixel>,
        text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            text: text.into(),
            category: category.into(),
        }
    }
}

/// NaN maps to 0 so a broken score never sorts ahead of real ones.
pub(crate) fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(id: &str, confidence: f64) -> DetectionItem {
        DetectionItem::new(id, CanonicalRect::new(0.0, 0.0, 1.0, 1.0), "part", id)
            .with_confidence(confidence)
    }

    #[test]
    fn test_detection_builder_pattern() {
        let item = det("a", 1.7).with_metadata("source", "ocr");
        assert_eq!(item.confidence, 1.0);
        assert_eq!(item.metadata.get("source"), Some(&"ocr".to_string()));
        assert_eq!(det("b", f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_confidence_order_is_stable() {
        let items = ItemSet {
            detections: vec![det("c", 0.5), det("a", 0.9), det("b", 0.5)],
            ..Default::default()
        };
        let ids: Vec<&str> = items
            .detections_by_confidence()
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_line_style_parsing() {
        assert_eq!(LineStyle::parse("dashed"), LineStyle::Dashed);
        assert_eq!(LineStyle::parse("Double-Chain"), LineStyle::DoubleChain);
        assert_eq!(LineStyle::parse("dash dot"), LineStyle::Chain);
        assert_eq!(LineStyle::parse("wavy"), LineStyle::Solid);
    }

    #[test]
    fn test_dash_pattern_scales() {
        assert!(LineStyle::Solid.dash_pattern(2.0).is_empty());
        assert_eq!(LineStyle::Dashed.dash_pattern(2.0), vec![16.0, 8.0]);
    }
}
