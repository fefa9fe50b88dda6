//! The paint plan: one ordered list of draw operations shared by the raster
//! and SVG backends.
//!
//! Building the plan resolves styles, derives resolution-dependent metrics,
//! orders detections and places their labels. The backends only translate
//! operations into pixels or markup, which keeps their output equivalent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::{
    CanonicalRect, DetectionItem, ItemId, ItemSet, LineItem, LineStyle, Pixel, Point, TextItem,
};
use crate::placement::{LabelPlacer, LabelRegion, Size};
use crate::style::{Color, StyleTable};

/// Reference image size at which metrics have scale 1.
const REFERENCE_EXTENT: f64 = 1000.0;
const MIN_SCALE: f64 = 1.0;
const MAX_SCALE: f64 = 4.0;

const BASE_STROKE_WIDTH: f64 = 2.0;
const BASE_FONT_SIZE: f64 = 12.0;
const BASE_PADDING: f64 = 4.0;
const BASE_GAP: f64 = 4.0;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_RATIO: f64 = 0.6;

/// Options that change what a pass draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Paint label captions next to detections.
    pub show_labels: bool,
    /// Append the confidence percentage to captions.
    pub show_confidence: bool,
    /// Category whose boxes get a doubled stroke width.
    pub emphasis_category: Option<String>,
    /// Opacity of the translucent box fill.
    pub fill_opacity: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_labels: true,
            show_confidence: false,
            emphasis_category: Some("gdt".to_string()),
            fill_opacity: 0.15,
        }
    }
}

/// Stroke width, font size and spacing for one image size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    pub scale: f64,
    pub stroke_width: f64,
    pub font_size: f64,
    pub padding: f64,
    pub gap: f64,
}

impl Metrics {
    /// `scale = clamp(max(width, height) / 1000, 1, 4)`.
    pub fn for_image(width: u32, height: u32) -> Self {
        let extent = f64::from(width.max(height));
        let scale = (extent / REFERENCE_EXTENT).clamp(MIN_SCALE, MAX_SCALE);
        Self {
            scale,
            stroke_width: BASE_STROKE_WIDTH * scale,
            font_size: BASE_FONT_SIZE * scale,
            padding: BASE_PADDING * scale,
            gap: BASE_GAP * scale,
        }
    }

    /// Label box size for a caption, padding included.
    pub fn label_size(&self, text: &str) -> Size {
        Size::new(
            estimate_text_width(text, self.font_size) + 2.0 * self.padding,
            self.font_size + 2.0 * self.padding,
        )
    }
}

/// Backend-independent text width estimate.
///
/// Both backends size label backgrounds from this value, so the boxes match
/// even though only the raster backend rasterizes real glyphs.
pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * CHAR_WIDTH_RATIO
}

/// Which SVG layer group an operation belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    BBoxes,
    Lines,
    Texts,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::BBoxes, Layer::Lines, Layer::Texts];

    pub fn group_id(&self) -> &'static str {
        match self {
            Layer::BBoxes => "layer-bboxes",
            Layer::Lines => "layer-lines",
            Layer::Texts => "layer-texts",
        }
    }
}

/// A placed caption.
#[derive(Clone, Debug, PartialEq)]
pub struct Caption {
    pub text: String,
    pub region: LabelRegion,
    pub background: Color,
    pub text_color: Color,
    pub font_size: f64,
    pub padding: f64,
}

impl Caption {
    /// Top-left corner of the caption text.
    pub fn text_origin(&self) -> Point<Pixel> {
        Point::new(self.region.x + self.padding, self.region.y + self.padding)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxOp {
    pub id: ItemId,
    pub category: String,
    /// The item's own label, kept verbatim for round-tripping.
    pub label: String,
    pub confidence: f64,
    pub rect: CanonicalRect,
    pub stroke: Color,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    pub fill: Color,
    pub fill_opacity: f64,
    pub dash: Vec<f64>,
    pub caption: Option<Caption>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineOp {
    pub id: ItemId,
    pub category: String,
    pub style: LineStyle,
    pub confidence: Option<f64>,
    pub start: Point<Pixel>,
    pub end: Point<Pixel>,
    pub color: Color,
    pub width: f64,
    pub dash: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextOp {
    pub id: ItemId,
    pub category: String,
    pub position: Point<Pixel>,
    pub text: String,
    pub color: Color,
    pub font_size: f64,
}

/// One draw operation with everything resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Box(BoxOp),
    Line(LineOp),
    Text(TextOp),
}

impl DrawOp {
    pub fn layer(&self) -> Layer {
        match self {
            DrawOp::Box(_) => Layer::BBoxes,
            DrawOp::Line(_) => Layer::Lines,
            DrawOp::Text(_) => Layer::Texts,
        }
    }

    pub fn id(&self) -> &ItemId {
        match self {
            DrawOp::Box(op) => &op.id,
            DrawOp::Line(op) => &op.id,
            DrawOp::Text(op) => &op.id,
        }
    }
}

/// Ordered draw operations for one pass over one image.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintPlan {
    pub width: u32,
    pub height: u32,
    pub metrics: Metrics,
    pub ops: Vec<DrawOp>,
}

impl PaintPlan {
    /// Builds the plan for already-filtered items.
    ///
    /// Detections come first in confidence-descending order, then lines, then
    /// texts, each in input order.
    pub fn build(
        items: &ItemSet,
        styles: &StyleTable,
        width: u32,
        height: u32,
        options: &RenderOptions,
    ) -> Self {
        let metrics = Metrics::for_image(width, height);
        let canvas = Size::new(f64::from(width), f64::from(height));
        let mut placer = LabelPlacer::new(canvas, metrics.gap);
        let mut ops = Vec::with_capacity(items.len());

        for item in items.detections_by_confidence() {
            ops.push(DrawOp::Box(box_op(item, styles, &metrics, options, &mut placer)));
        }
        for item in &items.lines {
            ops.push(DrawOp::Line(line_op(item, styles, &metrics)));
        }
        for item in &items.texts {
            ops.push(DrawOp::Text(text_op(item, styles, &metrics)));
        }

        log::debug!(
            "built paint plan {}x{} with {} ops at scale {:.2}",
            width,
            height,
            ops.len(),
            metrics.scale
        );

        Self {
            width,
            height,
            metrics,
            ops,
        }
    }

    /// Operations of one layer, in paint order.
    pub fn layer_ops(&self, layer: Layer) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(move |op| op.layer() == layer)
    }

    /// Box operations in paint order.
    pub fn boxes(&self) -> impl Iterator<Item = &BoxOp> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Box(op) => Some(op),
            _ => None,
        })
    }

    /// Regions claimed by captions, in placement order.
    pub fn label_regions(&self) -> Vec<LabelRegion> {
        self.boxes()
            .filter_map(|op| op.caption.as_ref().map(|caption| caption.region))
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.ops.len()
    }
}

/// Caption text: the item's label (or the style's default), plus the
/// confidence percentage when requested.
pub fn caption_text(item: &DetectionItem, default_label: &str, show_confidence: bool) -> String {
    let base = if item.label.trim().is_empty() {
        default_label
    } else {
        item.label.as_str()
    };
    if show_confidence {
        format!("{base} {:.0}%", item.confidence * 100.0)
    } else {
        base.to_string()
    }
}

fn box_op(
    item: &DetectionItem,
    styles: &StyleTable,
    metrics: &Metrics,
    options: &RenderOptions,
    placer: &mut LabelPlacer,
) -> BoxOp {
    let style = styles.resolve(&item.category);

    // Confidence never changes the color, only opacity and weight.
    let emphasis = options
        .emphasis_category
        .as_deref()
        .is_some_and(|category| category.eq_ignore_ascii_case(item.category.trim()));
    let mut stroke_width = metrics.stroke_width * (0.75 + 0.5 * item.confidence);
    if emphasis {
        stroke_width *= 2.0;
    }
    let stroke_opacity = 0.4 + 0.6 * item.confidence;

    let caption = options.show_labels.then(|| {
        let text = caption_text(item, &style.label, options.show_confidence);
        let region = placer.place(&item.rect, metrics.label_size(&text));
        Caption {
            text,
            region,
            background: style.color,
            text_color: style.color.contrasting_text(),
            font_size: metrics.font_size,
            padding: metrics.padding,
        }
    });

    BoxOp {
        id: item.id.clone(),
        category: item.category.clone(),
        label: item.label.clone(),
        confidence: item.confidence,
        rect: item.rect,
        stroke: style.color,
        stroke_width,
        stroke_opacity,
        fill: style.fill,
        fill_opacity: options.fill_opacity.clamp(0.0, 1.0) * stroke_opacity,
        dash: style.dash.iter().map(|len| len * metrics.scale).collect(),
        caption,
        metadata: item.metadata.clone(),
    }
}

fn line_op(item: &LineItem, styles: &StyleTable, metrics: &Metrics) -> LineOp {
    let style = styles.resolve(&item.category);
    // An explicit line style wins over the category's default dash.
    let dash = if item.style == LineStyle::Solid {
        style.dash.iter().map(|len| len * metrics.scale).collect()
    } else {
        item.style.dash_pattern(metrics.scale)
    };

    LineOp {
        id: item.id.clone(),
        category: item.category.clone(),
        style: item.style,
        confidence: item.confidence,
        start: item.start,
        end: item.end,
        color: style.color,
        width: metrics.stroke_width,
        dash,
    }
}

fn text_op(item: &TextItem, styles: &StyleTable, metrics: &Metrics) -> TextOp {
    TextOp {
        id: item.id.clone(),
        category: item.category.clone(),
        position: item.position,
        text: item.text.clone(),
        color: styles.resolve(&item.category).color,
        font_size: metrics.font_size,
    }
}
