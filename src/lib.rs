//! Ruled-table extraction from PDF pages.
//!
//! A page is rendered to a raster, the drawn cell borders are found as
//! contours, the resulting rectangles are grouped into rows and mapped back to
//! PDF points, and the page's text layer is read once per cell.

pub mod config;
pub mod coordinates;
pub mod debug_images;
pub mod detector;
pub mod error;
pub mod grid;
pub mod logger;
pub mod parser;
pub mod pdf_renderer;
pub mod preprocess;
pub mod table_extractor;
pub mod text_layer;

pub use config::{CellBoundary, Settings, SettingsBuilder};
pub use error::{Result, TableError};
pub use grid::{CellId, Grid};
pub use parser::{PageOutcome, PdfTableParser};
pub use pdf_renderer::{get_pdf_page_count, init_pdfium, open_document};
pub use table_extractor::{detect_table_grid, parse_page, ParsedTablePage};
