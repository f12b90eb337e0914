// Multi-page entry points over an open pdfium document
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{info, warn};

use crate::config::Settings;
use crate::debug_images::{DebugSink, DirectorySink, NullSink};
use crate::error::{Result, TableError};
use crate::pdf_renderer::{get_pdf_page_count, PageRenderer};
use crate::table_extractor::{detect_table_grid, parse_page, ParsedTablePage};
use crate::text_layer::PdfiumTextLayer;

/// Result for one page of a batch. A failed page does not stop the batch.
#[derive(Debug)]
pub struct PageOutcome {
    /// 1-based page number.
    pub page_number: usize,
    pub result: Result<ParsedTablePage>,
}

/// Parses ruled tables out of PDF pages.
#[derive(Debug)]
pub struct PdfTableParser {
    settings: Settings,
    renderer: PageRenderer,
}

impl Default for PdfTableParser {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl PdfTableParser {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            renderer: PageRenderer::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Zero-based page indices for the 1-based inclusive range `start..=end`.
    pub fn page_indices(
        document: &PdfDocument,
        start_page: usize,
        end_page: usize,
    ) -> Result<RangeInclusive<u16>> {
        if start_page == 0 || start_page > end_page {
            return Err(TableError::InvalidPageRange {
                start: start_page,
                end: end_page,
            });
        }
        let page_count = get_pdf_page_count(document);
        if end_page > page_count {
            return Err(TableError::PageOutOfRange {
                page: end_page,
                page_count,
            });
        }
        // end_page <= page_count, which pdfium reports as u16
        Ok((start_page - 1) as u16..=(end_page - 1) as u16)
    }

    fn render(&self, document: &PdfDocument, page_index: u16) -> Result<DynamicImage> {
        self.renderer.render_page(document, page_index, &self.settings)
    }

    /// Parse every page in `start_page..=end_page` (1-based).
    ///
    /// Only an invalid range fails the whole call; per-page failures are
    /// reported in the matching [`PageOutcome`].
    pub fn parse_pdf_pages(
        &self,
        document: &PdfDocument,
        start_page: usize,
        end_page: usize,
    ) -> Result<Vec<PageOutcome>> {
        let indices = Self::page_indices(document, start_page, end_page)?;
        let outcomes = indices
            .map(|page_index| {
                let page_number = usize::from(page_index) + 1;
                let result = self.parse_pdf_page(document, page_index);
                if let Err(e) = &result {
                    warn!(page_number, error = %e, "page failed");
                }
                PageOutcome {
                    page_number,
                    result,
                }
            })
            .collect();
        Ok(outcomes)
    }

    /// Render and parse the zero-based `page_index`.
    pub fn parse_pdf_page(&self, document: &PdfDocument, page_index: u16) -> Result<ParsedTablePage> {
        let image = self.render(document, page_index)?;
        self.extract_table_page(document, page_index, &image)
    }

    /// Parse a page whose raster has already been rendered at the configured
    /// DPI.
    pub fn extract_table_page(
        &self,
        document: &PdfDocument,
        page_index: u16,
        rendered: &DynamicImage,
    ) -> Result<ParsedTablePage> {
        let page = document.pages().get(page_index)?;
        let mut reader = PdfiumTextLayer::new(&page);
        let page_number = usize::from(page_index) + 1;

        let directory_sink;
        let sink: &dyn DebugSink = if self.settings.has_debug_images() {
            directory_sink = DirectorySink::from_settings(&self.settings);
            &directory_sink
        } else {
            &NullSink
        };

        let parsed = parse_page(&mut reader, page_number, rendered, &self.settings, sink)?;
        info!(
            page_number,
            rows = parsed.rows().len(),
            "page parsed"
        );
        Ok(parsed)
    }

    /// Render pages at the configured DPI and save them as `page_<n>.png`.
    pub fn save_pdf_pages_as_png(
        &self,
        document: &PdfDocument,
        start_page: usize,
        end_page: usize,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let indices = Self::page_indices(document, start_page, end_page)?;
        std::fs::create_dir_all(output_dir)?;

        let mut written = Vec::new();
        for page_index in indices {
            let image = self.render(document, page_index)?;
            let out_path = output_dir.join(format!("page_{}.png", usize::from(page_index) + 1));
            image.save(&out_path)?;
            info!(path = %out_path.display(), "page image written");
            written.push(out_path);
        }
        Ok(written)
    }

    /// Run detection on each page with debug images enabled, writing
    /// `page_<n>_<stage>.png` into `output_dir`.
    pub fn save_pdf_pages_debug_images(
        &self,
        document: &PdfDocument,
        start_page: usize,
        end_page: usize,
        output_dir: &Path,
    ) -> Result<()> {
        let indices = Self::page_indices(document, start_page, end_page)?;
        std::fs::create_dir_all(output_dir)?;

        for page_index in indices {
            let page_number = usize::from(page_index) + 1;
            let debug_settings = self
                .settings
                .with_debug_target(output_dir, format!("page_{page_number}"));
            let image = self.render(document, page_index)?;
            let grid = detect_table_grid(&image, &debug_settings)?;
            info!(page_number, cells = grid.cell_count(), "debug images written");
        }
        Ok(())
    }
}
