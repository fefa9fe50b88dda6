//! Axis-aligned rectangles in canonical XYWH form.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::point::Point;
use super::space::{Normalized, Pixel};

/// An axis-aligned rectangle stored as top-left corner plus size.
///
/// The constructor does not reject negative sizes so that intermediate values
/// can be represented; the geometry normalizer only ever hands out rectangles
/// for which [`Rect::is_valid`] holds.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect<TSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    _space: PhantomData<TSpace>,
}

/// The canonical bounding box every renderer consumes.
pub type CanonicalRect = Rect<Pixel>;

impl<TSpace> Rect<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: PhantomData,
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|value| value.is_finite())
    }

    /// Finite with a non-negative size.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }

    /// Half-open overlap test on both axes: rectangles that only share an
    /// edge do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: &Point<TSpace>) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

impl Rect<Normalized> {
    /// Scales a fractional rectangle to pixel space.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> Rect<Pixel> {
        Rect::new(
            self.x * image_width,
            self.y * image_height,
            self.width * image_width,
            self.height * image_height,
        )
    }
}

impl<TSpace> std::fmt::Debug for Rect<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rect")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for Rect<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl<TSpace> Serialize for Rect<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for Rect<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RectData {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
        }
        let data = RectData::deserialize(deserializer)?;
        Ok(Rect::new(data.x, data.y, data.width, data.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect: CanonicalRect = Rect::new(10.0, 10.0, 40.0, 30.0);
        assert_eq!(rect.right(), 50.0);
        assert_eq!(rect.bottom(), 40.0);
    }

    #[test]
    fn test_rect_validity() {
        assert!(CanonicalRect::new(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(!CanonicalRect::new(0.0, 0.0, -1.0, 5.0).is_valid());
        assert!(!CanonicalRect::new(f64::NAN, 0.0, 1.0, 5.0).is_valid());
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = CanonicalRect::new(0.0, 0.0, 10.0, 10.0);
        let b = CanonicalRect::new(10.0, 0.0, 10.0, 10.0);
        let c = CanonicalRect::new(9.0, 9.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn test_contains_is_half_open() {
        let rect = CanonicalRect::new(10.0, 10.0, 5.0, 5.0);
        assert!(rect.contains(&Point::new(10.0, 10.0)));
        assert!(rect.contains(&Point::new(14.9, 14.9)));
        assert!(!rect.contains(&Point::new(15.0, 12.0)));
    }

    #[test]
    fn test_normalized_to_pixel() {
        let rect: Rect<Normalized> = Rect::new(0.1, 0.2, 0.5, 0.25);
        let px = rect.to_pixel(1000.0, 400.0);
        assert_eq!(px, Rect::new(100.0, 80.0, 500.0, 100.0));
    }
}
