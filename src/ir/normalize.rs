//! Geometry normalizer.
//!
//! Detectors disagree on how a box is written down. This module recognizes
//! each supported encoding structurally (the payload carries no format flag)
//! and reduces it to one [`CanonicalRect`] in pixel space:
//!
//! - `[x, y, w, h]` or `[x1, y1, x2, y2]`, told apart by [`four_values_are_corners`]
//! - polygons `[[x1, y1], [x2, y2], ...]`, reduced to their bounding rectangle
//! - objects `{x, y, width, height}` (numeric strings accepted, missing fields 0)
//! - objects `{xmin, ymin, xmax, ymax}` or `{x1, y1, x2, y2}`
//! - a JSON string holding any of the above
//!
//! When the caller marks the geometry as normalized, values must lie in
//! `[0, 1]`; the shape is reduced in normalized space and then scaled by the
//! image size.
//!
//! Every function here is total: malformed input yields `None`, never a panic.

use serde_json::{Map, Value};

use super::point::Point;
use super::rect::{CanonicalRect, Rect};
use super::space::{Normalized, Pixel};

/// Slack allowed when checking that fractional values stay inside `[0, 1]`.
const NORMALIZED_EPS: f64 = 1e-9;

/// A second coordinate pair further than this from the first (on both axes)
/// is read as a corner.
const CORNER_OFFSET_PX: f64 = 50.0;

/// Normalizes a raw bbox value into a pixel-space rectangle.
///
/// Returns `None` for unrecognized shapes, non-finite numbers, negative sizes,
/// or out-of-range fractional values. Callers skip such items.
pub fn normalize(
    raw: &Value,
    image_width: f64,
    image_height: f64,
    normalized: bool,
) -> Option<CanonicalRect> {
    let (x, y, width, height) = reduce_shape(raw, 0)?;

    let rect = if normalized {
        if !valid_dimension(image_width) || !valid_dimension(image_height) {
            return None;
        }
        let fractional: Rect<Normalized> = Rect::new(x, y, width, height);
        if !within_unit(fractional.x)
            || !within_unit(fractional.y)
            || !within_unit(fractional.right())
            || !within_unit(fractional.bottom())
        {
            return None;
        }
        fractional.to_pixel(image_width, image_height)
    } else {
        Rect::<Pixel>::new(x, y, width, height)
    };

    rect.is_valid().then_some(rect)
}

/// Normalizes a raw point value (`{x, y}` or `[x, y]`) into pixel space.
pub fn normalize_point(
    raw: &Value,
    image_width: f64,
    image_height: f64,
    normalized: bool,
) -> Option<Point<Pixel>> {
    let (x, y) = point_values(raw)?;

    let point = if normalized {
        if !valid_dimension(image_width) || !valid_dimension(image_height) {
            return None;
        }
        if !within_unit(x) || !within_unit(y) {
            return None;
        }
        Point::<Normalized>::new(x, y).to_pixel(image_width, image_height)
    } else {
        Point::new(x, y)
    };

    point.is_finite().then_some(point)
}

/// Decides whether the last two values of a four-number bbox are a second
/// corner rather than a size.
///
/// The rule is a heuristic kept exactly as upstream consumers expect it:
/// corners when `x2 > x1 && y2 > y1` and the pair is either more than double
/// the first pair on some axis or more than 50px further on both. Small,
/// nearly square boxes close to the origin are ambiguous; a box written as
/// `[10, 10, 15, 15]` is always read as a 15x15 size.
pub fn four_values_are_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> bool {
    x2 > x1
        && y2 > y1
        && (x2 > 2.0 * x1
            || y2 > 2.0 * y1
            || (x2 > x1 + CORNER_OFFSET_PX && y2 > y1 + CORNER_OFFSET_PX))
}

/// Fuzz-only entrypoint for shape reduction without the validity filter.
#[cfg(feature = "fuzzing")]
pub fn fuzz_reduce_shape(raw: &Value) -> Option<(f64, f64, f64, f64)> {
    reduce_shape(raw, 0)
}

/// Reduces any supported shape to raw `(x, y, width, height)`.
fn reduce_shape(raw: &Value, depth: u8) -> Option<(f64, f64, f64, f64)> {
    match raw {
        Value::Array(values) => reduce_array(values),
        Value::Object(map) => reduce_object(map),
        // Some exporters stringify the bbox; unwrap one level only.
        Value::String(text) if depth == 0 => {
            let inner: Value = serde_json::from_str(text.trim()).ok()?;
            reduce_shape(&inner, depth + 1)
        }
        _ => None,
    }
}

fn reduce_array(values: &[Value]) -> Option<(f64, f64, f64, f64)> {
    if values.len() == 4 && values.iter().all(is_scalar) {
        let x1 = coerce_number(&values[0])?;
        let y1 = coerce_number(&values[1])?;
        let a = coerce_number(&values[2])?;
        let b = coerce_number(&values[3])?;

        return if four_values_are_corners(x1, y1, a, b) {
            Some((x1, y1, a - x1, b - y1))
        } else {
            Some((x1, y1, a, b))
        };
    }

    if values.len() >= 2 {
        let points: Option<Vec<(f64, f64)>> = values.iter().map(point_values).collect();
        return bounding_box(&points?);
    }

    None
}

fn reduce_object(map: &Map<String, Value>) -> Option<(f64, f64, f64, f64)> {
    let has = |key: &str| map.contains_key(key);

    if has("width") || has("height") || has("x") || has("y") {
        let x = field_or_zero(map, "x")?;
        let y = field_or_zero(map, "y")?;
        let width = field_or_zero(map, "width")?;
        let height = field_or_zero(map, "height")?;
        return Some((x, y, width, height));
    }

    for [kx1, ky1, kx2, ky2] in [["xmin", "ymin", "xmax", "ymax"], ["x1", "y1", "x2", "y2"]] {
        if has(kx1) && has(ky1) && has(kx2) && has(ky2) {
            let x1 = field_or_zero(map, kx1)?;
            let y1 = field_or_zero(map, ky1)?;
            let x2 = field_or_zero(map, kx2)?;
            let y2 = field_or_zero(map, ky2)?;
            return Some((x1, y1, x2 - x1, y2 - y1));
        }
    }

    None
}

fn bounding_box(points: &[(f64, f64)]) -> Option<(f64, f64, f64, f64)> {
    let (first, rest) = points.split_first()?;
    let (mut xmin, mut ymin) = *first;
    let (mut xmax, mut ymax) = *first;
    for &(x, y) in rest {
        xmin = xmin.min(x);
        ymin = ymin.min(y);
        xmax = xmax.max(x);
        ymax = ymax.max(y);
    }
    Some((xmin, ymin, xmax - xmin, ymax - ymin))
}

fn point_values(raw: &Value) -> Option<(f64, f64)> {
    match raw {
        Value::Array(values) if values.len() >= 2 && values.iter().all(is_scalar) => {
            Some((coerce_number(&values[0])?, coerce_number(&values[1])?))
        }
        Value::Object(map) if map.contains_key("x") || map.contains_key("y") => {
            Some((field_or_zero(map, "x")?, field_or_zero(map, "y")?))
        }
        _ => None,
    }
}

/// Missing or null fields count as 0; present fields must be numeric.
fn field_or_zero(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key) {
        None | Some(Value::Null) => Some(0.0),
        Some(value) => coerce_number(value),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::String(_))
}

fn within_unit(value: f64) -> bool {
    (-NORMALIZED_EPS..=1.0 + NORMALIZED_EPS).contains(&value)
}

fn valid_dimension(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
