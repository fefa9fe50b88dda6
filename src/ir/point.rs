//! Points tagged with their coordinate space.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::space::{Normalized, Pixel};

/// A point in `TSpace`.
///
/// Line endpoints and text anchors are stored as `Point<Pixel>`; the
/// normalizer builds `Point<Normalized>` for fractional payloads and converts
/// them with [`Point::to_pixel`]. Serializes as `{"x": .., "y": ..}`.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Point<TSpace> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    _space: PhantomData<TSpace>,
}

impl<TSpace> Point<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Point<Normalized> {
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> Point<Pixel> {
        Point::new(self.x * image_width, self.y * image_height)
    }
}

impl<TSpace> std::fmt::Debug for Point<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
