// End-to-end page parsing over synthetic rasters and an in-memory text layer
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use pdftable::config::{CellBoundary, Settings};
use pdftable::coordinates::{DocRect, DocSize};
use pdftable::debug_images::{RecordingSink, BINARY_INVERTED_THRESHOLD, CANNY, ORIGINAL_GRAYSCALED};
use pdftable::error::{Result, TableError};
use pdftable::table_extractor::{detect_table_grid, parse_page};
use pdftable::text_layer::{Glyph, RegionTextCollector, TextRegionReader};

/// Text layer backed by a fixed glyph list.
struct FakeTextLayer {
    glyphs: Vec<Glyph>,
    size: DocSize,
    collector: RegionTextCollector,
    extract_calls: usize,
}

impl FakeTextLayer {
    fn new(width: f32, height: f32, glyphs: Vec<Glyph>) -> Self {
        Self {
            glyphs,
            size: DocSize::new(width, height),
            collector: RegionTextCollector::new(),
            extract_calls: 0,
        }
    }
}

impl TextRegionReader for FakeTextLayer {
    fn add_region(&mut self, name: &str, rect: DocRect) {
        self.collector.add_region(name, rect);
    }

    fn extract_regions(&mut self) -> Result<()> {
        self.extract_calls += 1;
        self.collector.collect(self.glyphs.clone());
        Ok(())
    }

    fn text_for_region(&self, name: &str) -> String {
        self.collector.text_for_region(name)
    }

    fn page_size(&self) -> DocSize {
        self.size
    }
}

fn blank(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

fn ruled_box(img: &mut GrayImage, x: i32, y: i32, w: u32, h: u32) {
    draw_hollow_rect_mut(img, Rect::at(x, y).of_size(w, h), Luma([0]));
    draw_hollow_rect_mut(img, Rect::at(x + 1, y + 1).of_size(w - 2, h - 2), Luma([0]));
}

fn word(text: &str, x: f32, y: f32) -> Vec<Glyph> {
    text.chars()
        .enumerate()
        .map(|(i, ch)| Glyph::new(ch, x + i as f32 * 6.0, y, 6.0, 10.0))
        .collect()
}

/// At 72 DPI one pixel is one point, so glyph positions line up with the raster.
fn identity_settings() -> Settings {
    Settings::builder().rendering_dpi(72).build().unwrap()
}

#[test]
fn test_single_cell_page() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 150, 60);

    let mut glyphs = word("Total:", 30.0, 40.0);
    glyphs.extend(word("42", 80.0, 40.0));
    let mut reader = FakeTextLayer::new(300.0, 200.0, glyphs);

    let parsed = parse_page(
        &mut reader,
        1,
        &DynamicImage::ImageLuma8(img),
        &identity_settings(),
        &RecordingSink::new(),
    )
    .unwrap();

    assert_eq!(parsed.page_number(), 1);
    assert_eq!(parsed.rows(), &[vec!["Total: 42".to_string()]]);
    assert_eq!(reader.extract_calls, 1);
}

#[test]
fn test_two_by_two_separate_boxes() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 120, 50);
    ruled_box(&mut img, 150, 20, 120, 50);
    ruled_box(&mut img, 20, 80, 120, 50);
    ruled_box(&mut img, 150, 80, 120, 50);

    let mut glyphs = word("Item", 30.0, 35.0);
    glyphs.extend(word("Qty", 160.0, 35.0));
    glyphs.extend(word("Bolt", 30.0, 95.0));
    glyphs.extend(word("4", 160.0, 95.0));
    let mut reader = FakeTextLayer::new(300.0, 200.0, glyphs);

    let parsed = parse_page(
        &mut reader,
        2,
        &DynamicImage::ImageLuma8(img),
        &identity_settings(),
        &RecordingSink::new(),
    )
    .unwrap();

    assert_eq!(
        parsed.rows(),
        &[
            vec!["Item".to_string(), "Qty".to_string()],
            vec!["Bolt".to_string(), "4".to_string()],
        ]
    );
    assert_eq!(
        parsed.to_markdown(),
        "| Item | Qty |\n| --- | --- |\n| Bolt | 4 |\n"
    );
}

#[test]
fn test_edge_map_finds_cells_and_text() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 120, 50);
    ruled_box(&mut img, 150, 20, 120, 50);
    ruled_box(&mut img, 20, 80, 120, 50);
    ruled_box(&mut img, 150, 80, 120, 50);
    let image = DynamicImage::ImageLuma8(img);

    let settings = Settings::builder()
        .rendering_dpi(72)
        .canny_filtering(true)
        .build()
        .unwrap();

    let grid = detect_table_grid(&image, &settings).unwrap();
    assert_eq!(grid.row_count(), 2);
    assert!(grid.rows().iter().all(|row| row.len() == 2));
    // Edge contours hug the rule lines, so each cell stays near its drawn box
    for (cell, rect) in grid.cells() {
        let x = if cell.col == 0 { 20 } else { 150 };
        let y = if cell.row == 0 { 20 } else { 80 };
        assert!((rect.origin.x - x).abs() <= 2, "{cell}: {rect:?}");
        assert!((rect.origin.y - y).abs() <= 2, "{cell}: {rect:?}");
    }

    let mut glyphs = word("Item", 30.0, 35.0);
    glyphs.extend(word("Qty", 160.0, 35.0));
    glyphs.extend(word("Bolt", 30.0, 95.0));
    glyphs.extend(word("4", 160.0, 95.0));
    let mut reader = FakeTextLayer::new(300.0, 200.0, glyphs);

    let parsed = parse_page(&mut reader, 1, &image, &settings, &RecordingSink::new()).unwrap();
    assert_eq!(
        parsed.rows(),
        &[
            vec!["Item".to_string(), "Qty".to_string()],
            vec!["Bolt".to_string(), "4".to_string()],
        ]
    );
}

#[test]
fn test_connected_table_with_hole_boundaries() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 10, 10, 241, 141);
    draw_filled_rect_mut(&mut img, Rect::at(130, 10).of_size(2, 141), Luma([0]));
    draw_filled_rect_mut(&mut img, Rect::at(10, 80).of_size(241, 2), Luma([0]));

    let mut glyphs = word("a", 60.0, 40.0);
    glyphs.extend(word("b", 180.0, 40.0));
    glyphs.extend(word("c", 60.0, 110.0));
    glyphs.extend(word("d", 180.0, 110.0));

    // Outer boundaries see one table-sized cell holding everything
    let mut reader = FakeTextLayer::new(300.0, 200.0, glyphs.clone());
    let image = DynamicImage::ImageLuma8(img);
    let outer = parse_page(&mut reader, 1, &image, &identity_settings(), &RecordingSink::new())
        .unwrap();
    assert_eq!(outer.rows().len(), 1);
    assert_eq!(outer.rows()[0].len(), 1);

    let settings = Settings::builder()
        .rendering_dpi(72)
        .cell_boundary(CellBoundary::Holes)
        .build()
        .unwrap();
    let mut reader = FakeTextLayer::new(300.0, 200.0, glyphs);
    let holes = parse_page(&mut reader, 1, &image, &settings, &RecordingSink::new()).unwrap();
    assert_eq!(
        holes.rows(),
        &[
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string(), "d".to_string()],
        ]
    );
}

#[test]
fn test_page_without_table_has_no_rows() {
    let mut reader = FakeTextLayer::new(300.0, 200.0, word("prose", 10.0, 10.0));
    let parsed = parse_page(
        &mut reader,
        5,
        &DynamicImage::ImageLuma8(blank(300, 200)),
        &identity_settings(),
        &RecordingSink::new(),
    )
    .unwrap();

    assert!(parsed.is_empty());
    assert_eq!(parsed.page_number(), 5);
    assert_eq!(reader.extract_calls, 0);
}

#[test]
fn test_cell_without_text_is_empty_string() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 150, 60);
    let mut reader = FakeTextLayer::new(300.0, 200.0, Vec::new());

    let parsed = parse_page(
        &mut reader,
        1,
        &DynamicImage::ImageLuma8(img),
        &identity_settings(),
        &RecordingSink::new(),
    )
    .unwrap();
    assert_eq!(parsed.rows(), &[vec![String::new()]]);
}

#[test]
fn test_cell_outside_page_is_an_error() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 250, 60);
    // Text layer claims a page narrower than the rendered cell
    let mut reader = FakeTextLayer::new(100.0, 200.0, Vec::new());

    let err = parse_page(
        &mut reader,
        1,
        &DynamicImage::ImageLuma8(img),
        &identity_settings(),
        &RecordingSink::new(),
    )
    .unwrap_err();
    assert!(matches!(err, TableError::RegionOutOfBounds { .. }));
    assert_eq!(reader.extract_calls, 0);
}

#[test]
fn test_dpi_scales_regions_into_points() {
    // 144 DPI: two pixels per point
    let mut img = blank(600, 400);
    ruled_box(&mut img, 40, 40, 300, 120);
    let settings = Settings::builder().rendering_dpi(144).build().unwrap();

    let mut reader = FakeTextLayer::new(300.0, 200.0, word("half", 40.0, 40.0));
    let parsed = parse_page(
        &mut reader,
        1,
        &DynamicImage::ImageLuma8(img),
        &settings,
        &RecordingSink::new(),
    )
    .unwrap();
    assert_eq!(parsed.rows(), &[vec!["half".to_string()]]);
}

#[test]
fn test_debug_disabled_writes_nothing() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 150, 60);
    let sink = RecordingSink::new();
    let mut reader = FakeTextLayer::new(300.0, 200.0, Vec::new());

    parse_page(
        &mut reader,
        1,
        &DynamicImage::ImageLuma8(img),
        &identity_settings(),
        &sink,
    )
    .unwrap();
    assert!(sink.stages().is_empty());
}

#[test]
fn test_debug_enabled_records_each_stage() {
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 150, 60);
    let image = DynamicImage::ImageLuma8(img);
    let sink = RecordingSink::new();

    let settings = Settings::builder()
        .rendering_dpi(72)
        .debug_images(true)
        .build()
        .unwrap();
    let mut reader = FakeTextLayer::new(300.0, 200.0, Vec::new());
    parse_page(&mut reader, 1, &image, &settings, &sink).unwrap();
    assert_eq!(
        sink.stages(),
        vec![ORIGINAL_GRAYSCALED, BINARY_INVERTED_THRESHOLD]
    );

    sink.clear();
    let settings = settings.to_builder().canny_filtering(true).build().unwrap();
    let mut reader = FakeTextLayer::new(300.0, 200.0, Vec::new());
    parse_page(&mut reader, 1, &image, &settings, &sink).unwrap();
    assert_eq!(
        sink.stages(),
        vec![ORIGINAL_GRAYSCALED, BINARY_INVERTED_THRESHOLD, CANNY]
    );
}

#[test]
fn test_debug_images_land_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut img = blank(300, 200);
    ruled_box(&mut img, 20, 20, 150, 60);

    let settings = identity_settings().with_debug_target(dir.path(), "page_1");
    let grid = detect_table_grid(&DynamicImage::ImageLuma8(img), &settings).unwrap();

    assert_eq!(grid.cell_count(), 1);
    assert!(dir.path().join("page_1_original_grayscaled.png").exists());
    assert!(dir.path().join("page_1_binary_inverted_threshold.png").exists());
    assert!(!dir.path().join("page_1_canny1.png").exists());
}

#[test]
fn test_empty_image_is_rejected() {
    let mut reader = FakeTextLayer::new(300.0, 200.0, Vec::new());
    let err = parse_page(
        &mut reader,
        1,
        &DynamicImage::ImageLuma8(GrayImage::new(0, 0)),
        &identity_settings(),
        &RecordingSink::new(),
    )
    .unwrap_err();
    assert!(matches!(err, TableError::EmptyImage { .. }));
}
