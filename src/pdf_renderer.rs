use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Result, TableError};

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Bind the pdfium library once per process.
///
/// Looks in `library_dir` first, then falls back to the system library. Later
/// calls return the instance bound by the first successful call and ignore
/// `library_dir`.
pub fn init_pdfium(library_dir: Option<&Path>) -> Result<&'static Pdfium> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                .or_else(|_| Pdfium::bind_to_system_library()),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| TableError::LibraryInit(e.to_string()))?;
        info!("pdfium bound");
        Ok(Pdfium::new(bindings))
    })
}

/// Open a PDF from disk with the process-wide pdfium instance.
pub fn open_document(pdfium: &'static Pdfium, path: &Path) -> Result<PdfDocument<'static>> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| TableError::Pdf(format!("{}: {}", path.display(), e)))
}

/// Renders pages of one document. pdfium must not render two pages of the
/// same document concurrently, so every render call takes the lock; nothing
/// else does.
#[derive(Debug, Default)]
pub struct PageRenderer {
    lock: Mutex<()>,
}

impl PageRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the zero-based `page_index` at the settings' rendering DPI.
    pub fn render_page(
        &self,
        document: &PdfDocument,
        page_index: u16,
        settings: &Settings,
    ) -> Result<DynamicImage> {
        let page_count = document.pages().len();
        if page_index >= page_count {
            return Err(TableError::PageOutOfRange {
                page: usize::from(page_index) + 1,
                page_count: usize::from(page_count),
            });
        }

        let scale = render_scale(settings);
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let image = {
            let _guard = self.lock.lock().map_err(|_| TableError::LockPoisoned)?;
            let page = document.pages().get(page_index)?;
            let bitmap = page.render_with_config(&config)?;
            bitmap.as_image()
        };

        debug!(
            page_index,
            dpi = settings.rendering_dpi(),
            scale,
            width = image.width(),
            height = image.height(),
            "page rendered"
        );
        Ok(image)
    }
}

/// Pixels per document point. The inverse of [`Settings::dpi_ratio`], so a
/// rendered page maps back onto the text layer through `CoordinateMapper`.
pub fn render_scale(settings: &Settings) -> f32 {
    (1.0 / settings.dpi_ratio()) as f32
}

/// Number of pages in a document.
pub fn get_pdf_page_count(document: &PdfDocument) -> usize {
    usize::from(document.pages().len())
}
