// Typed coordinate spaces and the pixel → document mapping

use euclid::{Point2D, Rect, Scale, Size2D};

use crate::config::Settings;
use crate::error::{Result, TableError};
use crate::grid::{CellId, Grid};

/// Raster pixels at the rendering DPI, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSpace;

/// PDF user space points, origin top-left (y grows downwards like the raster).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentSpace;

pub type PixelRect = Rect<i32, PixelSpace>;
pub type DocRect = Rect<i32, DocumentSpace>;
pub type DocSize = Size2D<f32, DocumentSpace>;

/// Shorthand for building a pixel rectangle from `x, y, width, height`.
pub fn pixel_rect(x: i32, y: i32, width: i32, height: i32) -> PixelRect {
    Rect::new(Point2D::new(x, y), Size2D::new(width, height))
}

/// Converts raster rectangles to document-space rectangles.
///
/// Built from the same [`Settings`] the page was rendered with.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    points_per_inch: f64,
    rendering_dpi: f64,
}

impl CoordinateMapper {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            points_per_inch: f64::from(settings.points_per_inch()),
            rendering_dpi: f64::from(settings.rendering_dpi()),
        }
    }

    pub fn scale(&self) -> Scale<f64, PixelSpace, DocumentSpace> {
        Scale::new(self.points_per_inch / self.rendering_dpi)
    }

    /// Multiply-then-divide keeps exact products exact (e.g. 100 * 72 / 200 = 36)
    /// before truncating toward zero.
    fn scale_value(&self, value: i32) -> i32 {
        (f64::from(value) * self.points_per_inch / self.rendering_dpi).trunc() as i32
    }

    pub fn to_document_space(&self, rect: PixelRect) -> DocRect {
        Rect::new(
            Point2D::new(self.scale_value(rect.origin.x), self.scale_value(rect.origin.y)),
            Size2D::new(
                self.scale_value(rect.size.width),
                self.scale_value(rect.size.height),
            ),
        )
    }

    pub fn map_grid(&self, grid: &Grid<PixelSpace>) -> Grid<DocumentSpace> {
        grid.map(|rect| self.to_document_space(rect))
    }

    /// Rectangles that leave the page are an error; they are never clamped.
    pub fn check_within_page(&self, cell: CellId, rect: DocRect, page: DocSize) -> Result<DocRect> {
        let fits = rect.origin.x >= 0
            && rect.origin.y >= 0
            && rect.max_x() as f32 <= page.width
            && rect.max_y() as f32 <= page.height;
        if fits {
            Ok(rect)
        } else {
            Err(TableError::RegionOutOfBounds {
                cell,
                rect,
                page_width: page.width,
                page_height: page.height,
            })
        }
    }
}
