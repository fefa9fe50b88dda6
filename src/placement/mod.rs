//! Label placement.
//!
//! Every detection label claims a region next to its box. Candidates are
//! tried in a fixed order (above, below, left, right). A candidate is accepted
//! only when its unclamped region already lies on the canvas and its clamped
//! region overlaps no earlier label; a candidate that would need clamping to
//! fit is passed over even if the clamped copy is free. When all four are
//! rejected the right-hand candidate is kept anyway: under extreme density
//! overlap is tolerated, running off the canvas is not. Every result is
//! clamped so it lies fully inside the canvas.
//!
//! Placement is order dependent. Callers feed items in a stable order
//! (confidence-descending) so higher-confidence detections pick first.

use crate::ir::{CanonicalRect, Rect};

/// A placed label, in pixel space.
pub type LabelRegion = CanonicalRect;

/// Width and height of a label or canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Where a label ended up relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
    Left,
    Right,
}

const SEARCH_ORDER: [Side; 4] = [Side::Above, Side::Below, Side::Left, Side::Right];

/// Places one label against the regions already in `used`.
///
/// The returned region always satisfies `x >= 0`, `y >= 0`,
/// `x + width <= canvas.width` and `y + height <= canvas.height`, provided
/// the canvas size itself is finite and non-negative. Labels larger than the
/// canvas are shrunk to fit.
pub fn place(
    anchor: &CanonicalRect,
    label: Size,
    canvas: Size,
    used: &[LabelRegion],
    gap: f64,
) -> LabelRegion {
    place_with_side(anchor, label, canvas, used, gap).0
}

/// Same as [`place`], also reporting which candidate was chosen.
pub fn place_with_side(
    anchor: &CanonicalRect,
    label: Size,
    canvas: Size,
    used: &[LabelRegion],
    gap: f64,
) -> (LabelRegion, Side) {
    let canvas = Size::new(sanitize(canvas.width), sanitize(canvas.height));
    let gap = sanitize(gap);
    let width = sanitize(label.width).min(canvas.width);
    let height = sanitize(label.height).min(canvas.height);

    let mut last = None;
    for side in SEARCH_ORDER {
        let (x, y) = candidate_origin(anchor, side, width, height, gap);
        let raw: LabelRegion = Rect::new(x, y, width, height);
        let clamped = clamp_region(raw, canvas, gap);

        if fits(&raw, canvas) && !used.iter().any(|region| region.overlaps(&clamped)) {
            return (clamped, side);
        }
        last = Some((clamped, side));
    }

    // All four candidates collided: keep the last one tried.
    last.unwrap_or_else(|| {
        let fallback = clamp_region(Rect::new(0.0, 0.0, width, height), canvas, gap);
        (fallback, Side::Right)
    })
}

/// Owns the used-region list for one render pass.
#[derive(Clone, Debug)]
pub struct LabelPlacer {
    canvas: Size,
    gap: f64,
    used: Vec<LabelRegion>,
}

impl LabelPlacer {
    pub fn new(canvas: Size, gap: f64) -> Self {
        Self {
            canvas,
            gap,
            used: Vec::new(),
        }
    }

    /// Places a label and records it so later labels avoid it.
    pub fn place(&mut self, anchor: &CanonicalRect, label: Size) -> LabelRegion {
        let region = place(anchor, label, self.canvas, &self.used, self.gap);
        self.used.push(region);
        region
    }

    /// Forgets every placed label; called at the start of each pass.
    pub fn reset(&mut self) {
        self.used.clear();
    }

    pub fn used(&self) -> &[LabelRegion] {
        &self.used
    }
}

fn candidate_origin(
    anchor: &CanonicalRect,
    side: Side,
    width: f64,
    height: f64,
    gap: f64,
) -> (f64, f64) {
    match side {
        Side::Above => (anchor.x, anchor.y - gap - height),
        Side::Below => (anchor.x, anchor.bottom() + gap),
        Side::Left => (anchor.x - gap - width, anchor.y),
        Side::Right => (anchor.right() + gap, anchor.y),
    }
}

fn fits(region: &LabelRegion, canvas: Size) -> bool {
    region.x >= 0.0
        && region.y >= 0.0
        && region.right() <= canvas.width
        && region.bottom() <= canvas.height
}

fn clamp_region(region: LabelRegion, canvas: Size, gap: f64) -> LabelRegion {
    Rect::new(
        clamp_axis(region.x, region.width, canvas.width, gap),
        clamp_axis(region.y, region.height, canvas.height, gap),
        region.width,
        region.height,
    )
}

/// Clamps a position to `[gap, extent - size - gap]`. When that range is
/// empty the label is centred instead.
fn clamp_axis(pos: f64, size: f64, extent: f64, gap: f64) -> f64 {
    let max = extent - size - gap;
    if max < gap {
        return ((extent - size) / 2.0).max(0.0);
    }
    let pos = if pos.is_finite() { pos } else { gap };
    pos.clamp(gap, max)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
