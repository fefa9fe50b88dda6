//! Canonical item model for detection overlays.
//!
//! Every upstream encoding (object detector boxes, line detector segments,
//! OCR text anchors) is normalized into this model before rendering. Both
//! backends and the SVG decoder work exclusively in these types.
//!
//! # Design Principles
//!
//! 1. **Typed coordinate spaces**: pixel and fractional geometry carry
//!    marker types, so a fractional box cannot reach a renderer unscaled.
//!
//! 2. **One canonical shape**: boxes are XYWH in pixel space with a
//!    non-negative size, whatever the detector sent.
//!
//! 3. **Total normalization**: malformed geometry becomes `None` and the item
//!    is skipped; nothing in this module panics on bad input.
//!
//! # Example
//!
//! ```
//! use detoverlay::ir::{normalize, DetectionItem, ItemSet};
//! use serde_json::json;
//!
//! let rect = normalize(&json!([[10, 10], [50, 10], [50, 40], [10, 40]]), 640.0, 480.0, false)
//!     .expect("polygon normalizes");
//!
//! let items = ItemSet {
//!     detections: vec![DetectionItem::new("d1", rect, "dimension", "12.5").with_confidence(0.9)],
//!     ..Default::default()
//! };
//! assert_eq!(items.len(), 1);
//! ```

mod ids;
pub mod io_json;
pub mod io_payload;
mod model;
pub mod normalize;
mod point;
mod rect;
mod space;

pub use ids::ItemId;
pub use model::{DetectionItem, ItemSet, LineItem, LineStyle, TextItem};
pub use normalize::{normalize, normalize_point};
pub use point::Point;
pub use rect::{CanonicalRect, Rect};
pub use space::{Normalized, Pixel};
