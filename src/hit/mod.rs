//! Point-to-item lookup for review tools.
//!
//! Boxes painted later sit on top, so the topmost item at a point is the
//! last containing one in paint order. Containment is half-open:
//! `x <= px < x + width` and `y <= py < y + height`.

use crate::ir::{CanonicalRect, DetectionItem, ItemId, Pixel, Point};
use crate::plan::PaintPlan;

/// Cell edge length used by [`HitGrid`], in pixels.
const DEFAULT_CELL_SIZE: f64 = 64.0;

/// Anything that can answer "which item is under this point?".
pub trait HitTest {
    fn hit(&self, point: &Point<Pixel>) -> Option<&ItemId>;
}

/// Linear scan over detections in paint order.
pub fn topmost_at<'a>(items: &'a [DetectionItem], point: &Point<Pixel>) -> Option<&'a ItemId> {
    items
        .iter()
        .rev()
        .find(|item| item.rect.contains(point))
        .map(|item| &item.id)
}

/// Linear scan over the boxes of a paint plan.
pub fn topmost_in_plan<'a>(plan: &'a PaintPlan, point: &Point<Pixel>) -> Option<&'a ItemId> {
    plan.boxes()
        .filter(|op| op.rect.contains(point))
        .last()
        .map(|op| &op.id)
}

impl HitTest for [DetectionItem] {
    fn hit(&self, point: &Point<Pixel>) -> Option<&ItemId> {
        topmost_at(self, point)
    }
}

impl HitTest for PaintPlan {
    fn hit(&self, point: &Point<Pixel>) -> Option<&ItemId> {
        topmost_in_plan(self, point)
    }
}

/// Uniform grid index over item rectangles.
///
/// Each cell lists the items overlapping it in paint order, so a query only
/// checks one cell. Answers always match [`topmost_at`] on the same input.
#[derive(Clone, Debug)]
pub struct HitGrid {
    entries: Vec<(ItemId, CanonicalRect)>,
    cell_size: f64,
    columns: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl HitGrid {
    /// Indexes detections for a `width` x `height` image, in paint order.
    pub fn from_items(items: &[DetectionItem], width: u32, height: u32) -> Self {
        Self::build(
            items.iter().map(|item| (item.id.clone(), item.rect)).collect(),
            width,
            height,
        )
    }

    /// Indexes the boxes of a paint plan.
    pub fn from_plan(plan: &PaintPlan) -> Self {
        Self::build(
            plan.boxes().map(|op| (op.id.clone(), op.rect)).collect(),
            plan.width,
            plan.height,
        )
    }

    fn build(entries: Vec<(ItemId, CanonicalRect)>, width: u32, height: u32) -> Self {
        let cell_size = DEFAULT_CELL_SIZE;
        let columns = ((f64::from(width) / cell_size).ceil() as usize).max(1);
        let rows = ((f64::from(height) / cell_size).ceil() as usize).max(1);
        let mut cells = vec![Vec::new(); columns * rows];

        for (idx, (_, rect)) in entries.iter().enumerate() {
            if !rect.is_valid() || rect.width <= 0.0 || rect.height <= 0.0 {
                continue;
            }
            let (col_start, col_end) = cell_span(rect.x, rect.right(), cell_size, columns);
            let (row_start, row_end) = cell_span(rect.y, rect.bottom(), cell_size, rows);
            for row in row_start..=row_end {
                for col in col_start..=col_end {
                    cells[row * columns + col].push(idx);
                }
            }
        }

        Self {
            entries,
            cell_size,
            columns,
            rows,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cell_of(&self, point: &Point<Pixel>) -> Option<usize> {
        if !point.is_finite() {
            return None;
        }
        let col = clamp_index(point.x, self.cell_size, self.columns);
        let row = clamp_index(point.y, self.cell_size, self.rows);
        Some(row * self.columns + col)
    }
}

impl HitTest for HitGrid {
    fn hit(&self, point: &Point<Pixel>) -> Option<&ItemId> {
        let cell = self.cell_of(point)?;
        self.cells[cell]
            .iter()
            .rev()
            .map(|&idx| &self.entries[idx])
            .find(|(_, rect)| rect.contains(point))
            .map(|(id, _)| id)
    }
}

/// Cells covered by `[start, end)` along one axis. Items outside the image
/// land in the edge cells, matching [`clamp_index`] for queries.
fn cell_span(start: f64, end: f64, cell_size: f64, count: usize) -> (usize, usize) {
    let first = clamp_index(start, cell_size, count);
    let last = clamp_index(end, cell_size, count);
    (first, last.max(first))
}

fn clamp_index(value: f64, cell_size: f64, count: usize) -> usize {
    let idx = (value / cell_size).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Rect;

    fn item(id: &str, x: f64, y: f64, w: f64, h: f64) -> DetectionItem {
        DetectionItem::new(id, Rect::new(x, y, w, h), "note", id)
    }

    #[test]
    fn later_items_win_overlaps() {
        let items = vec![
            item("under", 0.0, 0.0, 100.0, 100.0),
            item("over", 50.0, 50.0, 10.0, 10.0),
        ];
        assert_eq!(topmost_at(&items, &Point::new(55.0, 55.0)).unwrap().as_str(), "over");
        assert_eq!(topmost_at(&items, &Point::new(5.0, 5.0)).unwrap().as_str(), "under");
        assert_eq!(items.as_slice().hit(&Point::new(150.0, 5.0)), None);
    }

    #[test]
    fn containment_is_half_open() {
        let items = vec![item("a", 10.0, 10.0, 10.0, 10.0)];
        assert!(topmost_at(&items, &Point::new(10.0, 10.0)).is_some());
        assert!(topmost_at(&items, &Point::new(20.0, 15.0)).is_none());
        assert!(topmost_at(&items, &Point::new(15.0, 20.0)).is_none());
    }

    #[test]
    fn grid_agrees_with_linear_scan() {
        let items = vec![
            item("a", 0.0, 0.0, 300.0, 200.0),
            item("b", 60.0, 60.0, 10.0, 10.0),
            item("c", 120.0, 10.0, 70.0, 150.0),
            item("outside", 500.0, 500.0, 40.0, 40.0),
            item("empty", 30.0, 30.0, 0.0, 0.0),
        ];
        let grid = HitGrid::from_items(&items, 320, 240);
        for y in (0..600).step_by(7) {
            for x in (0..600).step_by(7) {
                let point = Point::new(f64::from(x), f64::from(y));
                assert_eq!(grid.hit(&point), topmost_at(&items, &point), "at {x},{y}");
            }
        }
        assert_eq!(grid.hit(&Point::new(f64::NAN, 0.0)), None);
    }
}
