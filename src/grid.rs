// Row/column grouping of detected cell rectangles

use std::fmt;

use euclid::Rect;

use crate::coordinates::{PixelRect, PixelSpace};

/// Position of a cell in the grid.
///
/// Formats as `r<row>c<col>`, the region name handed to text readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: usize,
    pub col: usize,
}

impl CellId {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn region_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row, self.col)
    }
}

/// Ordered rows of ordered cell rectangles in the unit space `U`.
#[derive(Debug)]
pub struct Grid<U> {
    rows: Vec<Vec<Rect<i32, U>>>,
}

// Manual impls: derives would demand `U: Clone/PartialEq` for the marker type.
impl<U> Clone for Grid<U> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
        }
    }
}

impl<U> PartialEq for Grid<U> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl<U> Default for Grid<U> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<U> Grid<U> {
    pub fn from_rows(rows: Vec<Vec<Rect<i32, U>>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Rect<i32, U>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells in row-major order with their grid position.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, Rect<i32, U>)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(col, rect)| (CellId::new(row, col), *rect))
        })
    }

    pub fn flatten(&self) -> Vec<Rect<i32, U>> {
        self.rows.iter().flatten().copied().collect()
    }

    /// Same shape, every rectangle passed through `f`.
    pub fn map<V>(&self, mut f: impl FnMut(Rect<i32, U>) -> Rect<i32, V>) -> Grid<V> {
        Grid {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|rect| f(*rect)).collect())
                .collect(),
        }
    }
}

/// Distinct top edges in ascending order, clustered so that every key lies
/// within `tolerance` pixels of its cluster's anchor (smallest key).
fn row_keys(rects: &[PixelRect], tolerance: u32) -> Vec<i32> {
    let mut tops: Vec<i32> = rects.iter().map(|r| r.origin.y).collect();
    tops.sort_unstable();
    tops.dedup();

    let tolerance = i64::from(tolerance);
    let mut anchors: Vec<i32> = Vec::new();
    for top in tops {
        match anchors.last() {
            Some(&anchor) if i64::from(top) - i64::from(anchor) <= tolerance => {}
            _ => anchors.push(top),
        }
    }
    anchors
}

/// Group detected rectangles into rows keyed by their top edge.
///
/// With `row_tolerance == 0` a rectangle joins the row whose key equals its
/// own top edge exactly. Cells inside a row are ordered by ascending x; ties
/// keep detection order.
pub fn group_into_grid(rects: &[PixelRect], row_tolerance: u32) -> Grid<PixelSpace> {
    let keys = row_keys(rects, row_tolerance);
    let mut rows: Vec<Vec<PixelRect>> = vec![Vec::new(); keys.len()];

    for rect in rects {
        // Last anchor not above the rectangle's top edge.
        let idx = keys.partition_point(|&key| key <= rect.origin.y) - 1;
        rows[idx].push(*rect);
    }

    for row in &mut rows {
        row.sort_by_key(|r| r.origin.x);
    }

    Grid { rows }
}
