//! SVG encoding and decoding of overlays.
//!
//! The encoder writes a standalone `<svg>` document from a [`PaintPlan`], so
//! its output matches what the raster backend paints for the same pass.
//! Every item becomes one `<g>` element carrying its id, category, label and
//! confidence as attributes; geometry sits on the group's first shape child.
//!
//! The decoder reads such documents back into canonical items. It is
//! deliberately forgiving: malformed elements are skipped and an unparsable
//! document yields no items rather than an error.

use std::collections::BTreeMap;

use roxmltree::Node;
use serde::{Deserialize, Serialize};

use crate::ir::{
    CanonicalRect, DetectionItem, ItemId, ItemSet, LineItem, LineStyle, Pixel, Point, Rect,
    TextItem,
};
use crate::layers::LayerVisibility;
use crate::plan::{BoxOp, DrawOp, Layer, LineOp, PaintPlan, RenderOptions, TextOp};
use crate::style::{dash_attr, StyleTable};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

const CLASS_ITEM: &str = "overlay-item";
const CLASS_BBOX: &str = "overlay-bbox";
const CLASS_LINE: &str = "overlay-line";
const CLASS_TEXT: &str = "overlay-text";
const CLASS_LABEL_BG: &str = "overlay-label-bg";
const CLASS_LABEL: &str = "overlay-label";

/// `data-*` attributes with a fixed meaning; everything else is metadata.
const RESERVED_DATA_KEYS: [&str; 5] = ["category", "label", "confidence", "interactive", "style"];

/// Encoder settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SvgOptions {
    /// Output size in pixels; normally the source image size.
    pub width: u32,
    pub height: u32,
    /// Emit tooltips and focusable, pointer-enabled items.
    pub interactive: bool,
    /// Drawing options shared with the raster backend.
    pub render: RenderOptions,
    /// Background image reference (URL or data URL).
    pub background_href: Option<String>,
}

impl SvgOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_background(mut self, href: impl Into<String>) -> Self {
        self.background_href = Some(href.into());
        self
    }
}

/// JSON wrapper handed to hosts alongside the markup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgEnvelope {
    pub markup: String,
    pub width: u32,
    pub height: u32,
    pub item_count: usize,
}

// ============================================================================
// Public API
// ============================================================================

/// Encodes a prepared plan. Only `interactive` and `background_href` are
/// read from `options`; size and styling come from the plan.
pub fn encode(plan: &PaintPlan, options: &SvgOptions) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"{SVG_NAMESPACE}\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" class=\"detection-overlay\">",
        w = plan.width,
        h = plan.height,
    ));

    if let Some(href) = &options.background_href {
        svg.push_str(&format!(
            "<image href=\"{}\" x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\"/>",
            xml_escape(href),
            plan.width,
            plan.height
        ));
    }

    for layer in Layer::ALL {
        svg.push_str(&format!("<g id=\"{}\">", layer.group_id()));
        for op in plan.layer_ops(layer) {
            match op {
                DrawOp::Box(op) => write_box(&mut svg, op, options.interactive),
                DrawOp::Line(op) => write_line(&mut svg, op, options.interactive),
                DrawOp::Text(op) => write_text(&mut svg, op),
            }
        }
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

/// Filters, plans and encodes in one call.
pub fn encode_items(
    items: &ItemSet,
    styles: &StyleTable,
    visibility: &LayerVisibility,
    options: &SvgOptions,
) -> String {
    encode(&plan_for(items, styles, visibility, options), options)
}

/// Like [`encode_items`], wrapped with size and item count.
pub fn encode_envelope(
    items: &ItemSet,
    styles: &StyleTable,
    visibility: &LayerVisibility,
    options: &SvgOptions,
) -> SvgEnvelope {
    let plan = plan_for(items, styles, visibility, options);
    SvgEnvelope {
        markup: encode(&plan, options),
        width: plan.width,
        height: plan.height,
        item_count: plan.item_count(),
    }
}

/// Reads detections back out of overlay markup.
pub fn decode(markup: &str) -> Vec<DetectionItem> {
    decode_items(markup).detections
}

/// Reads every overlay item kind back out of overlay markup.
pub fn decode_items(markup: &str) -> ItemSet {
    let document = match roxmltree::Document::parse(markup) {
        Ok(document) => document,
        Err(err) => {
            log::warn!("could not parse overlay markup: {err}");
            return ItemSet::default();
        }
    };

    let mut items = ItemSet::default();
    for node in document.descendants().filter(Node::is_element) {
        if is_detection_element(node) {
            if let Some(item) = decode_detection(node, items.detections.len()) {
                items.detections.push(item);
            }
        } else if has_class(node, CLASS_LINE) {
            if let Some(item) = decode_line(node, items.lines.len()) {
                items.lines.push(item);
            }
        } else if has_class(node, CLASS_TEXT) {
            if let Some(item) = decode_text(node, items.texts.len()) {
                items.texts.push(item);
            }
        }
    }

    log::debug!(
        "decoded {} detections, {} lines, {} texts from markup",
        items.detections.len(),
        items.lines.len(),
        items.texts.len()
    );
    items
}

fn plan_for(
    items: &ItemSet,
    styles: &StyleTable,
    visibility: &LayerVisibility,
    options: &SvgOptions,
) -> PaintPlan {
    let visible = visibility.filter(items);
    PaintPlan::build(&visible, styles, options.width, options.height, &options.render)
}

// ============================================================================
// Encoding
// ============================================================================

fn write_box(svg: &mut String, op: &BoxOp, interactive: bool) {
    svg.push_str(&format!(
        "<g id=\"{}\" class=\"{CLASS_ITEM} {CLASS_BBOX}\" data-category=\"{}\" data-label=\"{}\" data-confidence=\"{}\"",
        xml_escape(op.id.as_str()),
        xml_escape(&op.category),
        xml_escape(&op.label),
        op.confidence
    ));
    for (key, value) in &op.metadata {
        if is_metadata_key(key) {
            svg.push_str(&format!(" data-{key}=\"{}\"", xml_escape(value)));
        }
    }
    write_interaction_attrs(svg, interactive);
    svg.push('>');

    if interactive {
        let name = if op.label.trim().is_empty() {
            op.category.as_str()
        } else {
            op.label.as_str()
        };
        svg.push_str(&format!(
            "<title>{} ({:.0}%)</title>",
            xml_escape(name),
            op.confidence * 100.0
        ));
    }

    svg.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" fill-opacity=\"{:.3}\" stroke=\"{}\" stroke-opacity=\"{:.3}\" stroke-width=\"{:.2}\"",
        op.rect.x,
        op.rect.y,
        op.rect.width,
        op.rect.height,
        op.fill,
        op.fill_opacity,
        op.stroke,
        op.stroke_opacity,
        op.stroke_width
    ));
    write_dash_attr(svg, &op.dash);
    svg.push_str("/>");

    if let Some(caption) = &op.caption {
        let origin = caption.text_origin();
        svg.push_str(&format!(
            "<rect class=\"{CLASS_LABEL_BG}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            caption.region.x,
            caption.region.y,
            caption.region.width,
            caption.region.height,
            caption.background
        ));
        svg.push_str(&format!(
            "<text class=\"{CLASS_LABEL}\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.2}\" font-family=\"sans-serif\" fill=\"{}\" dominant-baseline=\"hanging\">{}</text>",
            origin.x,
            origin.y,
            caption.font_size,
            caption.text_color,
            xml_escape(&caption.text)
        ));
    }

    svg.push_str("</g>");
}

fn write_line(svg: &mut String, op: &LineOp, interactive: bool) {
    svg.push_str(&format!(
        "<g id=\"{}\" class=\"{CLASS_ITEM} {CLASS_LINE}\" data-category=\"{}\" data-style=\"{}\"",
        xml_escape(op.id.as_str()),
        xml_escape(&op.category),
        op.style
    ));
    if let Some(confidence) = op.confidence {
        svg.push_str(&format!(" data-confidence=\"{confidence}\""));
    }
    write_interaction_attrs(svg, interactive);
    svg.push('>');

    if interactive {
        svg.push_str(&format!("<title>{}</title>", xml_escape(&op.category)));
    }

    svg.push_str(&format!(
        "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"",
        op.start.x, op.start.y, op.end.x, op.end.y, op.color, op.width
    ));
    write_dash_attr(svg, &op.dash);
    svg.push_str("/></g>");
}

fn write_text(svg: &mut String, op: &TextOp) {
    svg.push_str(&format!(
        "<g id=\"{}\" class=\"{CLASS_ITEM} {CLASS_TEXT}\" data-category=\"{}\" pointer-events=\"none\">",
        xml_escape(op.id.as_str()),
        xml_escape(&op.category)
    ));
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" font-size=\"{:.2}\" font-family=\"sans-serif\" fill=\"{}\" dominant-baseline=\"hanging\">{}</text>",
        op.position.x,
        op.position.y,
        op.font_size,
        op.color,
        xml_escape(&op.text)
    ));
    svg.push_str("</g>");
}

fn write_interaction_attrs(svg: &mut String, interactive: bool) {
    if interactive {
        svg.push_str(" pointer-events=\"all\" tabindex=\"0\" data-interactive=\"true\"");
    } else {
        svg.push_str(" pointer-events=\"none\"");
    }
}

fn write_dash_attr(svg: &mut String, dash: &[f64]) {
    if !dash.is_empty() {
        svg.push_str(&format!(" stroke-dasharray=\"{}\"", dash_attr(dash)));
    }
}

/// Escapes text for use in element content and quoted attribute values.
///
/// Tab, newline and carriage return become character references so they
/// survive attribute-value normalization. Characters XML cannot represent
/// at all are dropped.
pub fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' => escaped.push_str("&#9;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            ch if is_xml_char(ch) => escaped.push(ch),
            _ => {}
        }
    }
    escaped
}

fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn is_metadata_key(key: &str) -> bool {
    let mut chars = key.chars();
    let starts_well = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
    starts_well
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !RESERVED_DATA_KEYS.contains(&key)
}

// ============================================================================
// Decoding
// ============================================================================

fn is_detection_element(node: Node<'_, '_>) -> bool {
    if has_class(node, CLASS_BBOX) {
        return true;
    }
    has_class(node, CLASS_ITEM)
        && !has_class(node, CLASS_LINE)
        && !has_class(node, CLASS_TEXT)
        && shape_node(node, "rect").is_some()
}

fn decode_detection(node: Node<'_, '_>, index: usize) -> Option<DetectionItem> {
    let Some(rect) = shape_node(node, "rect").and_then(parse_rect) else {
        log::debug!("skipping overlay element without usable rect geometry");
        return None;
    };

    let id = item_id(node, "det", index);
    let category = attr_or(node, "data-category", "unknown");
    let label = node
        .attribute("data-label")
        .map(ToOwned::to_owned)
        .or_else(|| child_element(node, "title").map(element_text))
        .unwrap_or_else(|| category.clone());
    let confidence = node
        .attribute("data-confidence")
        .and_then(parse_number)
        .unwrap_or(1.0);

    let mut item = DetectionItem::new(id, rect, category, label).with_confidence(confidence);
    item.metadata = metadata_attrs(node);
    Some(item)
}

fn decode_line(node: Node<'_, '_>, index: usize) -> Option<LineItem> {
    let line = shape_node(node, "line")?;
    let coord = |name: &str| line.attribute(name).map_or(Some(0.0), parse_number);
    let start = Point::new(coord("x1")?, coord("y1")?);
    let end = Point::new(coord("x2")?, coord("y2")?);

    let category = attr_or(node, "data-category", "line");
    let style = node
        .attribute("data-style")
        .map(LineStyle::parse)
        .unwrap_or_default();

    let mut item =
        LineItem::new(item_id(node, "line", index), start, end, category).with_style(style);
    if let Some(confidence) = node.attribute("data-confidence").and_then(parse_number) {
        item = item.with_confidence(confidence);
    }
    Some(item)
}

fn decode_text(node: Node<'_, '_>, index: usize) -> Option<TextItem> {
    let text_node = shape_node(node, "text")?;
    let coord = |name: &str| text_node.attribute(name).map_or(Some(0.0), parse_number);
    let position: Point<Pixel> = Point::new(coord("x")?, coord("y")?);
    let text = element_text(text_node);
    if text.is_empty() {
        return None;
    }
    let category = attr_or(node, "data-category", "text");
    Some(TextItem::new(item_id(node, "text", index), position, text, category))
}

/// The element itself when it has the wanted tag, else its first matching
/// child, else its first matching descendant.
fn shape_node<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    if node.tag_name().name() == tag {
        return Some(node);
    }
    child_element(node, tag).or_else(|| {
        node.descendants()
            .skip(1)
            .find(|child| child.is_element() && child.tag_name().name() == tag)
    })
}

fn parse_rect(node: Node<'_, '_>) -> Option<CanonicalRect> {
    let x = node.attribute("x").map_or(Some(0.0), parse_number)?;
    let y = node.attribute("y").map_or(Some(0.0), parse_number)?;
    let width = node.attribute("width").and_then(parse_number)?;
    let height = node.attribute("height").and_then(parse_number)?;
    let rect = Rect::new(x, y, width, height);
    rect.is_valid().then_some(rect)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches("px")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Ids are taken verbatim; only a missing attribute gets a generated one.
fn item_id(node: Node<'_, '_>, prefix: &str, index: usize) -> ItemId {
    node.attribute("id")
        .map(ItemId::from)
        .unwrap_or_else(|| ItemId::generated(prefix, index))
}

fn metadata_attrs(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.attributes()
        .filter_map(|attr| {
            let key = attr.name().strip_prefix("data-")?;
            (!RESERVED_DATA_KEYS.contains(&key))
                .then(|| (key.to_string(), attr.value().to_string()))
        })
        .collect()
}

fn has_class(node: Node<'_, '_>, class: &str) -> bool {
    node.attribute("class")
        .is_some_and(|classes| classes.split_whitespace().any(|token| token == class))
}

fn attr_or(node: Node<'_, '_>, name: &str, fallback: &str) -> String {
    node.attribute(name).unwrap_or(fallback).to_string()
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
