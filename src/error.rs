use std::path::PathBuf;

use crate::coordinates::DocRect;
use crate::grid::CellId;

pub type Result<T> = std::result::Result<T, TableError>;

/// Errors raised while turning a PDF page into a parsed table.
///
/// A page with no detectable table is not an error: detection returns an
/// empty grid and the page parses to zero rows.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("invalid page range {start}..={end} (pages are 1-based)")]
    InvalidPageRange { start: usize, end: usize },

    #[error(
        "cell {cell} maps to {rect:?}, outside the {page_width}x{page_height}pt page \
         (check rendering_dpi against points_per_inch)"
    )]
    RegionOutOfBounds {
        cell: CellId,
        rect: DocRect,
        page_width: f32,
        page_height: f32,
    },

    #[error("failed to write debug image {path}: {source}")]
    DebugWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Config(String),

    #[error("could not bind pdfium: {0}")]
    LibraryInit(String),

    #[error("renderer lock poisoned")]
    LockPoisoned,
}

impl From<pdfium_render::prelude::PdfiumError> for TableError {
    fn from(err: pdfium_render::prelude::PdfiumError) -> Self {
        TableError::Pdf(err.to_string())
    }
}
