//! Coordinate space markers.
//!
//! Upstream detectors report geometry either in absolute pixels or as
//! fractions of the image size. These zero-sized types tag [`Rect`](super::Rect)
//! and [`Point`](super::Point) so the two can never be mixed by accident.

use std::fmt;

/// Absolute pixel space, origin at the top-left corner of the source image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Fractional space where `(1.0, 1.0)` is the bottom-right image corner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
