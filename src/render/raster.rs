use std::path::Path;

use ab_glyph::{FontArc, FontVec, PxScale};
use fontdb::{Database, Family, Query, Stretch, Weight};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, Blend,
};
use imageproc::rect::Rect as PixelRect;

use super::Canvas;
use crate::error::OverlayError;
use crate::ir::{CanonicalRect, Pixel, Point};
use crate::style::Color;

/// Past this many dash segments a line is drawn solid.
const MAX_DASH_SEGMENTS: usize = 10_000;

/// [`Canvas`] over an in-memory RGBA bitmap.
///
/// Drawing alpha-blends onto the surface. Without a font, text is skipped
/// but label backgrounds are still painted.
pub struct RasterCanvas {
    surface: Blend<RgbaImage>,
    font: Option<FontArc>,
}

impl RasterCanvas {
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            surface: Blend(RgbaImage::new(0, 0)),
            font,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.surface.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.surface.0
    }

    fn pixel_rect(rect: &CanonicalRect) -> Option<PixelRect> {
        if !rect.is_finite() {
            return None;
        }
        let left = rect.x.round();
        let top = rect.y.round();
        let width = rect.right().round() - left;
        let height = rect.bottom().round() - top;
        if width < 1.0 || height < 1.0 {
            return None;
        }
        Some(PixelRect::at(left as i32, top as i32).of_size(width as u32, height as u32))
    }
}

impl std::fmt::Debug for RasterCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterCanvas")
            .field("width", &self.surface.0.width())
            .field("height", &self.surface.0.height())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Canvas for RasterCanvas {
    fn set_size(&mut self, width: u32, height: u32) {
        self.surface = Blend(RgbaImage::new(width, height));
    }

    fn draw_image(&mut self, image: &RgbaImage) {
        imageops::replace(&mut self.surface.0, image, 0, 0);
    }

    fn fill_rect(&mut self, rect: &CanonicalRect, color: Color, opacity: f64) {
        if let Some(rect) = Self::pixel_rect(rect) {
            draw_filled_rect_mut(&mut self.surface, rect, rgba(color, opacity));
        }
    }

    fn stroke_rect(
        &mut self,
        rect: &CanonicalRect,
        color: Color,
        opacity: f64,
        width: f64,
        dash: &[f64],
    ) {
        if !dash.is_empty() {
            let corners = [
                Point::new(rect.x, rect.y),
                Point::new(rect.right(), rect.y),
                Point::new(rect.right(), rect.bottom()),
                Point::new(rect.x, rect.bottom()),
            ];
            let color = rgba(color, opacity);
            for idx in 0..corners.len() {
                let (start, end) = (corners[idx], corners[(idx + 1) % corners.len()]);
                self.draw_thick_line(start, end, color, width, dash);
            }
            return;
        }

        // Solid outlines grow inwards one pixel ring at a time.
        let Some(outer) = Self::pixel_rect(rect) else {
            return;
        };
        let color = rgba(color, opacity);
        for inset in 0..thickness(width) {
            let inset_px = inset as i32;
            let shrink = 2 * inset;
            if outer.width() <= shrink || outer.height() <= shrink {
                break;
            }
            let ring = PixelRect::at(outer.left() + inset_px, outer.top() + inset_px)
                .of_size(outer.width() - shrink, outer.height() - shrink);
            draw_hollow_rect_mut(&mut self.surface, ring, color);
        }
    }

    fn stroke_line(
        &mut self,
        start: Point<Pixel>,
        end: Point<Pixel>,
        color: Color,
        width: f64,
        dash: &[f64],
    ) {
        self.draw_thick_line(start, end, rgba(color, 1.0), width, dash);
    }

    fn fill_text(&mut self, text: &str, origin: Point<Pixel>, color: Color, font_size: f64) {
        let Some(font) = &self.font else {
            return;
        };
        if !origin.is_finite() || !font_size.is_finite() || font_size <= 0.0 {
            return;
        }
        draw_text_mut(
            &mut self.surface,
            rgba(color, 1.0),
            origin.x.round() as i32,
            origin.y.round() as i32,
            PxScale::from(font_size as f32),
            font,
            text,
        );
    }
}

impl RasterCanvas {
    fn draw_thick_line(
        &mut self,
        start: Point<Pixel>,
        end: Point<Pixel>,
        color: Rgba<u8>,
        width: f64,
        dash: &[f64],
    ) {
        if !start.is_finite() || !end.is_finite() {
            return;
        }
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let length = dx.hypot(dy);
        let (nx, ny) = if length > 0.0 {
            (-dy / length, dx / length)
        } else {
            (0.0, 0.0)
        };

        let strokes = thickness(width);
        for (from, to) in dash_segments(start, end, dash) {
            for k in 0..strokes {
                let offset = f64::from(k) - f64::from(strokes - 1) / 2.0;
                draw_line_segment_mut(
                    &mut self.surface,
                    ((from.x + nx * offset) as f32, (from.y + ny * offset) as f32),
                    ((to.x + nx * offset) as f32, (to.y + ny * offset) as f32),
                    color,
                );
            }
        }
    }
}

/// Splits a line into its visible dash segments.
fn dash_segments(
    start: Point<Pixel>,
    end: Point<Pixel>,
    dash: &[f64],
) -> Vec<(Point<Pixel>, Point<Pixel>)> {
    let length = (end.x - start.x).hypot(end.y - start.y);
    let period: f64 = dash.iter().filter(|len| len.is_finite()).map(|len| len.max(0.0)).sum();
    if dash.is_empty() || length <= 0.0 || period <= 0.0 {
        return vec![(start, end)];
    }
    if length / period * dash.len() as f64 > MAX_DASH_SEGMENTS as f64 {
        return vec![(start, end)];
    }

    let at = |distance: f64| {
        let t = distance / length;
        Point::new(start.x + (end.x - start.x) * t, start.y + (end.y - start.y) * t)
    };

    let mut segments = Vec::new();
    let mut travelled = 0.0;
    let mut idx = 0usize;
    while travelled < length {
        let step = dash[idx % dash.len()];
        let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        let next = (travelled + step).min(length);
        // Even entries are "on", odd entries are gaps.
        if idx % 2 == 0 && next > travelled {
            segments.push((at(travelled), at(next)));
        }
        travelled = next;
        idx += 1;
    }
    segments
}

fn thickness(width: f64) -> u32 {
    if width.is_finite() {
        width.round().clamp(1.0, 64.0) as u32
    } else {
        1
    }
}

fn rgba(color: Color, opacity: f64) -> Rgba<u8> {
    let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    Rgba([color.r, color.g, color.b, (opacity * 255.0).round() as u8])
}

/// Loads a TrueType/OpenType font from `path`, or the system sans-serif face
/// when no path is given. A missing system font is not an error.
pub fn load_font(path: Option<&Path>) -> Result<Option<FontArc>, OverlayError> {
    let Some(path) = path else {
        let font = system_font();
        if font.is_none() {
            log::warn!("no system sans-serif font found; labels will be drawn without text");
        }
        return Ok(font);
    };

    let bytes = std::fs::read(path)
        .map_err(|err| OverlayError::FontLoad(format!("{}: {err}", path.display())))?;
    let font = FontArc::try_from_vec(bytes)
        .map_err(|err| OverlayError::FontLoad(format!("{}: {err}", path.display())))?;
    Ok(Some(font))
}

/// Finds the default sans-serif face through the system font database.
pub fn system_font() -> Option<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();

    let query = Query {
        families: &[Family::SansSerif],
        weight: Weight::NORMAL,
        stretch: Stretch::Normal,
        style: fontdb::Style::Normal,
    };
    let id = db.query(&query)?;
    db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
    })
    .flatten()
    .map(FontArc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Rect;

    const RED: Color = Color::rgb(255, 0, 0);

    #[test]
    fn set_size_clears_and_resizes() {
        let mut canvas = RasterCanvas::new(None);
        canvas.set_size(4, 3);
        assert_eq!(canvas.image().dimensions(), (4, 3));
        assert!(canvas.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn background_is_copied_at_origin() {
        let mut canvas = RasterCanvas::new(None);
        canvas.set_size(8, 8);
        canvas.draw_image(&RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255])));
        assert_eq!(canvas.image().get_pixel(7, 7).0, [10, 20, 30, 255]);
    }

    #[test]
    fn opaque_fill_and_outline() {
        let mut canvas = RasterCanvas::new(None);
        canvas.set_size(20, 20);
        canvas.draw_image(&RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255])));
        canvas.stroke_rect(&Rect::new(2.0, 2.0, 10.0, 10.0), RED, 1.0, 2.0, &[]);

        let image = canvas.image();
        assert_eq!(image.get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(6, 6).0, [255, 255, 255, 255]);

        canvas.fill_rect(&Rect::new(14.0, 14.0, 4.0, 4.0), RED, 1.0);
        assert_eq!(canvas.image().get_pixel(15, 15).0, [255, 0, 0, 255]);
    }

    #[test]
    fn degenerate_geometry_is_ignored() {
        let mut canvas = RasterCanvas::new(None);
        canvas.set_size(10, 10);
        canvas.fill_rect(&Rect::new(f64::NAN, 0.0, 5.0, 5.0), RED, 1.0);
        canvas.fill_rect(&Rect::new(1.0, 1.0, 0.0, 5.0), RED, 1.0);
        canvas.stroke_line(Point::new(0.0, f64::INFINITY), Point::new(5.0, 5.0), RED, 2.0, &[]);
        canvas.fill_text("x", Point::new(1.0, 1.0), RED, 12.0);
        assert!(canvas.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn dashes_alternate_on_and_off() {
        let segments = dash_segments(Point::new(0.0, 0.0), Point::new(20.0, 0.0), &[8.0, 4.0]);
        let spans: Vec<(f64, f64)> = segments.iter().map(|(a, b)| (a.x, b.x)).collect();
        assert_eq!(spans, vec![(0.0, 8.0), (12.0, 20.0)]);

        let solid = dash_segments(Point::new(0.0, 0.0), Point::new(20.0, 0.0), &[0.0, 0.0]);
        assert_eq!(solid.len(), 1);
    }
}
