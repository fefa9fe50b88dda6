//! Raster rendering of a paint plan.
//!
//! [`Canvas`] is the drawing capability a backend provides. [`paint`] walks a
//! [`PaintPlan`] and issues canvas calls in plan order; [`render`] is the full
//! pass: filter by visibility, build the plan, paint.
//!
//! [`RasterCanvas`] is the bundled backend, drawing into an `RgbaImage` with
//! `imageproc`. Image loading and PNG export live in [`export`].

pub mod export;
mod raster;

use image::RgbaImage;

use crate::ir::{CanonicalRect, ItemSet, Pixel, Point};
use crate::layers::LayerVisibility;
use crate::plan::{DrawOp, PaintPlan, RenderOptions};
use crate::style::{Color, StyleTable};

pub use export::{
    decode_image, encode_png, load_image, to_png_data_url, write_png, ImageLoadGate, LoadTicket,
};
pub use raster::{load_font, system_font, RasterCanvas};

/// A 2D drawing surface.
///
/// Coordinates are image pixels with the origin at the top-left corner.
/// Opacities are in `[0, 1]`. Dash arrays are SVG-style on/off lengths; an
/// empty array means a solid stroke.
pub trait Canvas {
    /// Resizes the surface and clears it.
    fn set_size(&mut self, width: u32, height: u32);

    /// Draws `image` at the origin at its native size.
    fn draw_image(&mut self, image: &RgbaImage);

    fn fill_rect(&mut self, rect: &CanonicalRect, color: Color, opacity: f64);

    fn stroke_rect(
        &mut self,
        rect: &CanonicalRect,
        color: Color,
        opacity: f64,
        width: f64,
        dash: &[f64],
    );

    fn stroke_line(
        &mut self,
        start: Point<Pixel>,
        end: Point<Pixel>,
        color: Color,
        width: f64,
        dash: &[f64],
    );

    /// Draws `text` with its top-left corner at `origin`.
    fn fill_text(&mut self, text: &str, origin: Point<Pixel>, color: Color, font_size: f64);
}

/// Runs one full render pass and returns the plan that was painted.
///
/// Hidden layers are filtered out first; `items` itself is not modified.
/// Running the same pass twice produces the same pixels.
pub fn render<C: Canvas + ?Sized>(
    canvas: &mut C,
    image: &RgbaImage,
    items: &ItemSet,
    styles: &StyleTable,
    visibility: &LayerVisibility,
    options: &RenderOptions,
) -> PaintPlan {
    let visible = visibility.filter(items);
    let plan = PaintPlan::build(&visible, styles, image.width(), image.height(), options);
    paint(canvas, Some(image), &plan);
    plan
}

/// Paints a prepared plan, optionally over a background image.
pub fn paint<C: Canvas + ?Sized>(canvas: &mut C, background: Option<&RgbaImage>, plan: &PaintPlan) {
    canvas.set_size(plan.width, plan.height);
    if let Some(image) = background {
        canvas.draw_image(image);
    }

    for op in &plan.ops {
        match op {
            DrawOp::Box(op) => {
                canvas.fill_rect(&op.rect, op.fill, op.fill_opacity);
                canvas.stroke_rect(
                    &op.rect,
                    op.stroke,
                    op.stroke_opacity,
                    op.stroke_width,
                    &op.dash,
                );
                if let Some(caption) = &op.caption {
                    canvas.fill_rect(&caption.region, caption.background, 1.0);
                    canvas.fill_text(
                        &caption.text,
                        caption.text_origin(),
                        caption.text_color,
                        caption.font_size,
                    );
                }
            }
            DrawOp::Line(op) => {
                canvas.stroke_line(op.start, op.end, op.color, op.width, &op.dash);
            }
            DrawOp::Text(op) => {
                canvas.fill_text(&op.text, op.position, op.color, op.font_size);
            }
        }
    }
}
