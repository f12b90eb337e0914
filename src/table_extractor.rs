use std::collections::HashMap;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::coordinates::{CoordinateMapper, DocumentSpace, PixelSpace};
use crate::debug_images::{
    DebugSink, DirectorySink, NullSink, BINARY_INVERTED_THRESHOLD, CANNY, ORIGINAL_GRAYSCALED,
};
use crate::detector::{ContourDetector, DetectionStrategy, RegionDetector};
use crate::error::Result;
use crate::grid::{group_into_grid, CellId, Grid};
use crate::preprocess::{binarize, edge_filter, to_grayscale};
use crate::text_layer::TextRegionReader;

/// Cell text of one page, row-major and shaped exactly like the detected grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTablePage {
    page_number: usize,
    rows: Vec<Vec<String>>,
}

impl ParsedTablePage {
    /// 1-based page number.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Format as markdown, first row as header
    pub fn to_markdown(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let mut markdown = String::new();
        let max_cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);

        for (row_idx, row) in self.rows.iter().enumerate() {
            markdown.push('|');
            for cell in row {
                markdown.push_str(&format!(" {} |", single_line(cell).replace('|', "\\|")));
            }
            // Fill empty columns if needed
            for _ in row.len()..max_cols {
                markdown.push_str(" |");
            }
            markdown.push('\n');

            if row_idx == 0 {
                markdown.push('|');
                for _ in 0..max_cols {
                    markdown.push_str(" --- |");
                }
                markdown.push('\n');
            }
        }

        markdown
    }

    /// Boxed text rendering that fits in `width` columns
    pub fn to_text_grid(&self, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        if self.rows.is_empty() {
            return lines;
        }

        // Calculate column widths
        let mut col_widths: Vec<usize> = Vec::new();
        for row in &self.rows {
            for (col_idx, cell) in row.iter().enumerate() {
                let len = single_line(cell).chars().count();
                if col_idx >= col_widths.len() {
                    col_widths.push(len);
                } else {
                    col_widths[col_idx] = col_widths[col_idx].max(len);
                }
            }
        }

        // 1 space padding on each side
        for w in &mut col_widths {
            *w += 2;
        }

        let total_width: usize = col_widths.iter().sum::<usize>() + col_widths.len() + 1;
        if total_width > width {
            // Scale down column widths proportionally
            let scale = width as f32 / total_width as f32;
            for w in &mut col_widths {
                *w = (((*w as f32) * scale) as usize).max(3);
            }
        }

        let mut border = String::from("+");
        for w in &col_widths {
            border.push_str(&"-".repeat(*w));
            border.push('+');
        }
        lines.push(border.clone());

        for row in &self.rows {
            let mut line = String::from("|");
            for (col_idx, w) in col_widths.iter().enumerate() {
                let text: String = row
                    .get(col_idx)
                    .map(|cell| single_line(cell).chars().take(w - 2).collect())
                    .unwrap_or_default();
                line.push_str(&format!(" {:<width$} |", text, width = w - 2));
            }
            lines.push(line);
        }

        lines.push(border);
        lines
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dump(sink: &dyn DebugSink, settings: &Settings, stage: &str, image: &image::GrayImage) {
    if !settings.has_debug_images() {
        return;
    }
    if let Err(e) = sink.write_image(stage, image) {
        warn!(stage, error = %e, "debug image not written");
    }
}

/// Detect the pixel-space cell grid of a rendered page.
///
/// Debug images go to the directory named in `settings` when enabled.
pub fn detect_table_grid(image: &DynamicImage, settings: &Settings) -> Result<Grid<PixelSpace>> {
    if settings.has_debug_images() {
        detect_table_grid_with_sink(image, settings, &DirectorySink::from_settings(settings))
    } else {
        detect_table_grid_with_sink(image, settings, &NullSink)
    }
}

/// [`detect_table_grid`] with an explicit debug sink. The sink is only
/// called when debug images are enabled in `settings`.
pub fn detect_table_grid_with_sink(
    image: &DynamicImage,
    settings: &Settings,
    sink: &dyn DebugSink,
) -> Result<Grid<PixelSpace>> {
    let gray = to_grayscale(image);
    dump(sink, settings, ORIGINAL_GRAYSCALED, &gray);

    let binary = binarize(&gray, settings.bit_threshold(), settings.bit_max_value())?;
    dump(sink, settings, BINARY_INVERTED_THRESHOLD, binary.as_gray());

    let detector = ContourDetector::from_settings(settings);
    let rects = match DetectionStrategy::from_settings(settings) {
        DetectionStrategy::EdgeMap => {
            let edges = edge_filter(
                &gray,
                settings.canny_threshold1(),
                settings.canny_threshold2(),
                settings.canny_aperture_size(),
                settings.has_canny_l2_gradient(),
            )?;
            dump(sink, settings, CANNY, edges.as_gray());
            detector.detect(&edges)
        }
        DetectionStrategy::BinaryThreshold => detector.detect(&binary),
    };

    let grid = group_into_grid(&rects, settings.row_tolerance());
    debug!(
        rectangles = rects.len(),
        rows = grid.row_count(),
        "table grid detected"
    );
    Ok(grid)
}

/// Register every cell as a named region, run one extraction pass and read
/// each cell's text back.
pub fn extract_text<R: TextRegionReader + ?Sized>(
    reader: &mut R,
    grid: &Grid<DocumentSpace>,
) -> Result<HashMap<CellId, String>> {
    for (cell, rect) in grid.cells() {
        reader.add_region(&cell.region_name(), rect);
    }

    reader.extract_regions()?;

    let texts = grid
        .cells()
        .map(|(cell, _)| (cell, reader.text_for_region(&cell.region_name())))
        .collect();
    Ok(texts)
}

/// Build the page result in grid order. Cells missing from `cell_texts`
/// read as empty strings.
pub fn assemble<U>(
    page_number: usize,
    grid: &Grid<U>,
    cell_texts: &HashMap<CellId, String>,
) -> ParsedTablePage {
    let rows = grid
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            (0..cells.len())
                .map(|col| {
                    cell_texts
                        .get(&CellId::new(row, col))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    ParsedTablePage { page_number, rows }
}

/// Full pipeline for one page: detect, map to document space, extract text
/// and assemble.
///
/// A page with no detected cells parses to an empty page without touching the
/// text layer.
pub fn parse_page<R: TextRegionReader + ?Sized>(
    reader: &mut R,
    page_number: usize,
    image: &DynamicImage,
    settings: &Settings,
    sink: &dyn DebugSink,
) -> Result<ParsedTablePage> {
    let pixel_grid = detect_table_grid_with_sink(image, settings, sink)?;
    if pixel_grid.is_empty() {
        debug!(page_number, "no table found");
        return Ok(assemble(page_number, &pixel_grid, &HashMap::new()));
    }

    let mapper = CoordinateMapper::from_settings(settings);
    let doc_grid = mapper.map_grid(&pixel_grid);
    let page_size = reader.page_size();
    for (cell, rect) in doc_grid.cells() {
        mapper.check_within_page(cell, rect, page_size)?;
    }

    let texts = extract_text(reader, &doc_grid)?;
    Ok(assemble(page_number, &doc_grid, &texts))
}
