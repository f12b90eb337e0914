//! Raster preprocessing: grayscale conversion, inverted binary threshold and
//! Canny edge maps.
//!
//! The detector never sees a concrete image type from this module. It works
//! against [`ForegroundImage`], which both [`BinaryImage`] and [`EdgeImage`]
//! implement, so either strategy can feed it.

use std::borrow::Cow;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::edges::canny;
use tracing::debug;

use crate::error::{Result, TableError};

/// Single-channel image where non-zero pixels are foreground (ink or edge).
pub trait ForegroundImage {
    fn dimensions(&self) -> (u32, u32);

    fn is_foreground(&self, x: u32, y: u32) -> bool;

    /// 0/255 mask view for contour tracing.
    fn to_mask(&self) -> Cow<'_, GrayImage> {
        let (width, height) = self.dimensions();
        Cow::Owned(GrayImage::from_fn(width, height, |x, y| {
            Luma([if self.is_foreground(x, y) { 255 } else { 0 }])
        }))
    }
}

/// Output of [`binarize`]: ink pixels hold `max_value`, paper pixels hold 0.
#[derive(Debug, Clone)]
pub struct BinaryImage(GrayImage);

/// Output of [`edge_filter`]: edge pixels are 255.
#[derive(Debug, Clone)]
pub struct EdgeImage(GrayImage);

impl BinaryImage {
    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

impl EdgeImage {
    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

impl ForegroundImage for BinaryImage {
    fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] != 0
    }

    fn to_mask(&self) -> Cow<'_, GrayImage> {
        Cow::Borrowed(&self.0)
    }
}

impl ForegroundImage for EdgeImage {
    fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] != 0
    }

    fn to_mask(&self) -> Cow<'_, GrayImage> {
        Cow::Borrowed(&self.0)
    }
}

fn ensure_not_empty(image: &GrayImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TableError::EmptyImage { width, height });
    }
    Ok(())
}

/// Luma conversion of a rendered page.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Binary inverted threshold.
///
/// Pixels brighter than `threshold` become background (0); everything else
/// becomes `max_value`. Dark rule lines on light paper therefore end up as
/// foreground.
pub fn binarize(image: &GrayImage, threshold: u8, max_value: u8) -> Result<BinaryImage> {
    ensure_not_empty(image)?;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 0 } else { max_value };
    }
    Ok(BinaryImage(out))
}

/// Canny edge map of the grayscale page.
///
/// imageproc's Canny always uses a 3x3 Sobel gradient with an L2 magnitude;
/// other aperture/gradient requests are accepted and run with that kernel.
pub fn edge_filter(
    image: &GrayImage,
    low_threshold: f32,
    high_threshold: f32,
    aperture_size: u8,
    l2_gradient: bool,
) -> Result<EdgeImage> {
    ensure_not_empty(image)?;
    if aperture_size != 3 || !l2_gradient {
        debug!(
            aperture_size,
            l2_gradient, "canny backend uses a 3x3 sobel aperture with L2 magnitude"
        );
    }
    Ok(EdgeImage(canny(image, low_threshold, high_threshold)))
}
