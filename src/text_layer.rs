//! Region-based text extraction from the document text layer.
//!
//! Regions are registered by name, then a single pass over the page's glyphs
//! distributes every glyph to each region containing its centre. Text per
//! region is read back in position order: lines top-to-bottom, glyphs within a
//! line left-to-right.

use std::collections::HashMap;

use euclid::{Point2D, Rect, Size2D};
use ordered_float::OrderedFloat;
use pdfium_render::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use crate::coordinates::{DocRect, DocSize, DocumentSpace};
use crate::error::Result;

/// Gap (as a fraction of the mean glyph width) that reads as a word break.
const SPACE_GAP_RATIO: f32 = 0.3;

/// Text-layer reader that answers "what text lies in this named rectangle".
pub trait TextRegionReader {
    fn add_region(&mut self, name: &str, rect: DocRect);

    /// Run one extraction pass covering every registered region.
    fn extract_regions(&mut self) -> Result<()>;

    /// Text for a region; empty if the region holds no text or is unknown.
    fn text_for_region(&self, name: &str) -> String;

    fn page_size(&self) -> DocSize;
}

/// A positioned glyph in document space (top-left origin).
#[derive(Debug, Clone)]
pub struct Glyph {
    pub ch: char,
    pub bounds: Rect<f32, DocumentSpace>,
}

impl Glyph {
    pub fn new(ch: char, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            ch,
            bounds: Rect::new(Point2D::new(x, y), Size2D::new(width, height)),
        }
    }

    fn center(&self) -> Point2D<f32, DocumentSpace> {
        self.bounds.center()
    }
}

#[derive(Debug, Clone)]
struct NamedRegion {
    slot: usize,
    rect: DocRect,
}

impl RTreeObject for NamedRegion {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.rect.min_x() as f32, self.rect.min_y() as f32],
            [self.rect.max_x() as f32, self.rect.max_y() as f32],
        )
    }
}

/// Collects glyphs into named regions and renders their text.
#[derive(Debug, Default)]
pub struct RegionTextCollector {
    index: HashMap<String, usize>,
    regions: Vec<NamedRegion>,
    texts: Vec<String>,
}

impl RegionTextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a name twice replaces its rectangle.
    pub fn add_region(&mut self, name: &str, rect: DocRect) {
        match self.index.get(name) {
            Some(&slot) => self.regions[slot].rect = rect,
            None => {
                let slot = self.regions.len();
                self.index.insert(name.to_string(), slot);
                self.regions.push(NamedRegion { slot, rect });
            }
        }
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Distribute `glyphs` over all regions in one pass and build each
    /// region's text. Replaces any previous results.
    pub fn collect(&mut self, glyphs: impl IntoIterator<Item = Glyph>) {
        let tree = RTree::bulk_load(self.regions.clone());
        let mut buckets: Vec<Vec<Glyph>> = vec![Vec::new(); self.regions.len()];

        let mut seen = 0usize;
        for glyph in glyphs {
            seen += 1;
            let c = glyph.center();
            let point = AABB::from_point([c.x, c.y]);
            // Envelopes are closed; the rect test makes membership half-open so
            // a centre on a shared edge belongs to one region only.
            for region in tree
                .locate_in_envelope_intersecting(&point)
                .filter(|region| region.rect.to_f32().contains(c))
            {
                buckets[region.slot].push(glyph.clone());
            }
        }

        self.texts = buckets.into_iter().map(assemble_text).collect();
        debug!(glyphs = seen, regions = self.regions.len(), "text regions collected");
    }

    pub fn text_for_region(&self, name: &str) -> String {
        self.index
            .get(name)
            .and_then(|&slot| self.texts.get(slot))
            .cloned()
            .unwrap_or_default()
    }
}

/// Order glyphs into lines and lines into text.
fn assemble_text(mut glyphs: Vec<Glyph>) -> String {
    if glyphs.is_empty() {
        return String::new();
    }
    glyphs.sort_by_key(|g| (OrderedFloat(g.bounds.min_y()), OrderedFloat(g.bounds.min_x())));

    // A glyph continues the current line while its vertical centre falls
    // inside the line's vertical extent.
    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    let mut extent = (f32::MIN, f32::MIN);
    for glyph in glyphs {
        let cy = glyph.center().y;
        match lines.last_mut() {
            Some(line) if cy >= extent.0 && cy <= extent.1 => {
                extent.1 = extent.1.max(glyph.bounds.max_y());
                line.push(glyph);
            }
            _ => {
                extent = (glyph.bounds.min_y(), glyph.bounds.max_y());
                lines.push(vec![glyph]);
            }
        }
    }

    lines
        .into_iter()
        .map(build_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_line(mut glyphs: Vec<Glyph>) -> String {
    glyphs.sort_by_key(|g| OrderedFloat(g.bounds.min_x()));
    let mean_width =
        glyphs.iter().map(|g| g.bounds.size.width).sum::<f32>() / glyphs.len() as f32;
    let space_gap = mean_width * SPACE_GAP_RATIO;

    let mut text = String::new();
    let mut prev: Option<&Glyph> = None;
    for glyph in &glyphs {
        if let Some(p) = prev {
            let gap = glyph.bounds.min_x() - p.bounds.max_x();
            if gap > space_gap && !p.ch.is_whitespace() && !glyph.ch.is_whitespace() {
                text.push(' ');
            }
        }
        text.push(glyph.ch);
        prev = Some(glyph);
    }
    text.trim_end().to_string()
}

/// Text layer of one pdfium page.
pub struct PdfiumTextLayer<'p, 'a> {
    page: &'p PdfPage<'a>,
    collector: RegionTextCollector,
}

impl<'p, 'a> PdfiumTextLayer<'p, 'a> {
    pub fn new(page: &'p PdfPage<'a>) -> Self {
        Self {
            page,
            collector: RegionTextCollector::new(),
        }
    }

    /// Every printable character of the page with its loose bounds flipped to
    /// a top-left origin.
    #[allow(deprecated)] // PdfRect field access deprecated in 0.8.28
    fn glyphs(&self) -> Result<Vec<Glyph>> {
        let page_height = self.page.height().value;
        let text = self.page.text()?;
        let mut glyphs = Vec::new();
        for ch in text.chars().iter() {
            let Some(unicode) = ch.unicode_char() else {
                continue;
            };
            if unicode.is_control() {
                continue;
            }
            let Ok(bounds) = ch.loose_bounds() else {
                continue;
            };
            glyphs.push(Glyph::new(
                unicode,
                bounds.left.value,
                page_height - bounds.top.value,
                (bounds.right.value - bounds.left.value).abs(),
                (bounds.top.value - bounds.bottom.value).abs(),
            ));
        }
        Ok(glyphs)
    }
}

impl TextRegionReader for PdfiumTextLayer<'_, '_> {
    fn add_region(&mut self, name: &str, rect: DocRect) {
        self.collector.add_region(name, rect);
    }

    fn extract_regions(&mut self) -> Result<()> {
        let glyphs = self.glyphs()?;
        self.collector.collect(glyphs);
        Ok(())
    }

    fn text_for_region(&self, name: &str) -> String {
        self.collector.text_for_region(name)
    }

    fn page_size(&self) -> DocSize {
        DocSize::new(self.page.width().value, self.page.height().value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_rect(x: i32, y: i32, w: i32, h: i32) -> DocRect {
        Rect::new(Point2D::new(x, y), Size2D::new(w, h))
    }

    fn word(text: &str, x: f32, y: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| Glyph::new(ch, x + i as f32 * 5.0, y, 5.0, 10.0))
            .collect()
    }

    #[test]
    fn test_glyphs_land_in_their_region() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("r0c0", doc_rect(0, 0, 100, 30));
        collector.add_region("r0c1", doc_rect(100, 0, 100, 30));

        let mut glyphs = word("left", 10.0, 10.0);
        glyphs.extend(word("right", 110.0, 10.0));
        collector.collect(glyphs);

        assert_eq!(collector.text_for_region("r0c0"), "left");
        assert_eq!(collector.text_for_region("r0c1"), "right");
    }

    #[test]
    fn test_position_order_not_stream_order() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("cell", doc_rect(0, 0, 200, 100));

        // Second line emitted first, letters of the first line reversed
        let mut glyphs = word("beta", 10.0, 40.0);
        let mut first = word("alpha", 10.0, 10.0);
        first.reverse();
        glyphs.extend(first);
        collector.collect(glyphs);

        assert_eq!(collector.text_for_region("cell"), "alpha\nbeta");
    }

    #[test]
    fn test_gap_becomes_space() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("cell", doc_rect(0, 0, 200, 30));
        let mut glyphs = word("Total:", 10.0, 5.0);
        glyphs.extend(word("42", 50.0, 5.0));
        collector.collect(glyphs);
        assert_eq!(collector.text_for_region("cell"), "Total: 42");
    }

    #[test]
    fn test_empty_and_unknown_regions() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("empty", doc_rect(300, 300, 10, 10));
        collector.collect(word("elsewhere", 0.0, 0.0));
        assert_eq!(collector.text_for_region("empty"), "");
        assert_eq!(collector.text_for_region("missing"), "");
    }

    #[test]
    fn test_centre_decides_membership() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("top", doc_rect(0, 0, 100, 20));
        collector.add_region("bottom", doc_rect(0, 20, 100, 20));
        // Straddles the boundary but its centre (y = 24) is in "bottom"
        collector.collect(vec![Glyph::new('x', 10.0, 18.0, 5.0, 12.0)]);
        assert_eq!(collector.text_for_region("top"), "");
        assert_eq!(collector.text_for_region("bottom"), "x");
    }

    #[test]
    fn test_centre_on_shared_edge_lands_once() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("left", doc_rect(0, 0, 100, 20));
        collector.add_region("right", doc_rect(100, 0, 100, 20));
        // Centre at exactly x = 100
        collector.collect(vec![Glyph::new('x', 97.0, 5.0, 6.0, 10.0)]);
        assert_eq!(collector.text_for_region("left"), "");
        assert_eq!(collector.text_for_region("right"), "x");
    }

    #[test]
    fn test_reregistering_replaces_rect() {
        let mut collector = RegionTextCollector::new();
        collector.add_region("cell", doc_rect(500, 500, 10, 10));
        collector.add_region("cell", doc_rect(0, 0, 100, 30));
        assert_eq!(collector.region_count(), 1);
        collector.collect(word("moved", 10.0, 10.0));
        assert_eq!(collector.text_for_region("cell"), "moved");
    }
}
