// Spatial hash grid for hit testing.
//
// The canvas is divided into square cells; each entry is filed under every
// cell its rectangle touches, so a point query only inspects one cell.

use crate::geometry::{PointF, RectF};
use std::collections::HashMap;

/// A spatial hash grid of rectangles tagged with a payload.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    /// Size of each cell in the grid.
    cell_size: f64,
    /// Entry indices per cell.
    cells: HashMap<(i64, i64), Vec<usize>>,
    entries: Vec<(RectF, T)>,
}

impl<T> SpatialGrid<T> {
    /// Cell size should be roughly the size of the largest expected item.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size.is_finite() && cell_size >= 1.0 { cell_size } else { 1.0 },
            cells: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        ((x / self.cell_size).floor() as i64, (y / self.cell_size).floor() as i64)
    }

    /// Compute which cells a rectangle overlaps.
    fn cell_range(&self, rect: &RectF) -> Vec<(i64, i64)> {
        let (min_x, min_y) = self.cell_of(rect.x, rect.y);
        let (max_x, max_y) = self.cell_of(rect.right(), rect.bottom());

        let mut cells = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                cells.push((cx, cy));
            }
        }
        cells
    }

    /// Insert a rectangle. Later inserts are on top of earlier ones.
    pub fn insert(&mut self, rect: RectF, payload: T) {
        let index = self.entries.len();
        for cell in self.cell_range(&rect) {
            self.cells.entry(cell).or_default().push(index);
        }
        self.entries.push((rect, payload));
    }

    /// Topmost entry containing `point`.
    pub fn topmost_at(&self, point: PointF) -> Option<&T> {
        let indices = self.cells.get(&self.cell_of(point.x, point.y))?;
        indices
            .iter()
            .rev()
            .map(|&i| &self.entries[i])
            .find(|(rect, _)| rect.contains(point))
            .map(|(_, payload)| payload)
    }

    /// Check if the given rectangle overlaps any rectangle in the grid.
    pub fn overlaps_any(&self, rect: &RectF) -> bool {
        self.cell_range(rect).iter().any(|cell| {
            self.cells
                .get(cell)
                .is_some_and(|ix| ix.iter().any(|&i| self.entries[i].0.overlaps(rect)))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(RectF { x: 0.0, y: 0.0, w: 50.0, h: 50.0 }, "a");
        grid.insert(RectF { x: 200.0, y: 200.0, w: 50.0, h: 50.0 }, "b");

        assert_eq!(grid.topmost_at(PointF::new(10.0, 10.0)), Some(&"a"));
        assert_eq!(grid.topmost_at(PointF::new(220.0, 230.0)), Some(&"b"));
        assert_eq!(grid.topmost_at(PointF::new(120.0, 120.0)), None);
    }

    #[test]
    fn test_later_insert_wins() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(RectF { x: 0.0, y: 0.0, w: 100.0, h: 100.0 }, 1);
        grid.insert(RectF { x: 40.0, y: 40.0, w: 20.0, h: 20.0 }, 2);
        assert_eq!(grid.topmost_at(PointF::new(50.0, 50.0)), Some(&2));
        assert_eq!(grid.topmost_at(PointF::new(90.0, 90.0)), Some(&1));
    }

    #[test]
    fn test_overlaps_any() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(RectF { x: 0.0, y: 0.0, w: 50.0, h: 50.0 }, ());

        assert!(grid.overlaps_any(&RectF { x: 25.0, y: 25.0, w: 50.0, h: 50.0 }));
        assert!(!grid.overlaps_any(&RectF { x: 100.0, y: 100.0, w: 50.0, h: 50.0 }));
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(RectF { x: -30.0, y: -30.0, w: 20.0, h: 20.0 }, 'n');
        assert_eq!(grid.topmost_at(PointF::new(-20.0, -20.0)), Some(&'n'));
    }
}
