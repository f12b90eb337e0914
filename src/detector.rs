// Cell boundary detection from a foreground image

use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::debug;

use crate::config::{CellBoundary, Settings};
use crate::coordinates::{pixel_rect, PixelRect};
use crate::preprocess::ForegroundImage;

/// Which preprocessed image feeds the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    BinaryThreshold,
    EdgeMap,
}

impl DetectionStrategy {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.has_canny_filtering() {
            DetectionStrategy::EdgeMap
        } else {
            DetectionStrategy::BinaryThreshold
        }
    }
}

/// Finds cell bounding rectangles. Results are in detection order, unsorted.
pub trait RegionDetector {
    fn detect(&self, image: &dyn ForegroundImage) -> Vec<PixelRect>;
}

/// Contour-tracing detector backed by imageproc's border following.
#[derive(Debug, Clone, Copy)]
pub struct ContourDetector {
    boundary: CellBoundary,
    min_area: u32,
}

impl ContourDetector {
    pub fn new(boundary: CellBoundary, min_area: u32) -> Self {
        Self { boundary, min_area }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.cell_boundary(), settings.min_cell_area())
    }

    fn is_cell(&self, contours: &[Contour<u32>], contour: &Contour<u32>) -> bool {
        match self.boundary {
            CellBoundary::Outer => {
                contour.border_type == BorderType::Outer && contour.parent.is_none()
            }
            CellBoundary::Holes => {
                contour.border_type == BorderType::Hole
                    && contour
                        .parent
                        .and_then(|idx| contours.get(idx))
                        .is_some_and(|p| p.border_type == BorderType::Outer && p.parent.is_none())
            }
        }
    }

    /// A hole border is traced on the rule pixels around it; the cell is the
    /// interior one pixel in from that border.
    fn cell_rect(&self, rect: PixelRect) -> PixelRect {
        match self.boundary {
            CellBoundary::Outer => rect,
            CellBoundary::Holes => pixel_rect(
                rect.origin.x + 1,
                rect.origin.y + 1,
                rect.size.width - 2,
                rect.size.height - 2,
            ),
        }
    }

    fn keeps(&self, rect: &PixelRect) -> bool {
        let (w, h) = (rect.size.width, rect.size.height);
        if w <= 0 || h <= 0 {
            return false;
        }
        i64::from(w) * i64::from(h) >= i64::from(self.min_area)
    }
}

/// Axis-aligned bounding box of a contour, inclusive of its edge pixels.
fn bounding_rect(contour: &Contour<u32>) -> Option<PixelRect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(pixel_rect(
        min_x as i32,
        min_y as i32,
        (max_x - min_x + 1) as i32,
        (max_y - min_y + 1) as i32,
    ))
}

impl RegionDetector for ContourDetector {
    fn detect(&self, image: &dyn ForegroundImage) -> Vec<PixelRect> {
        let mask = image.to_mask();
        let contours: Vec<Contour<u32>> = find_contours(&mask);

        let rects: Vec<PixelRect> = contours
            .iter()
            .filter(|c| self.is_cell(&contours, c))
            .filter_map(bounding_rect)
            .map(|r| self.cell_rect(r))
            .filter(|r| self.keeps(r))
            .collect();

        debug!(
            contours = contours.len(),
            cells = rects.len(),
            boundary = ?self.boundary,
            "contour detection"
        );
        rects
    }
}
