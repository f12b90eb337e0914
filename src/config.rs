//! Configuration for the table extraction pipeline.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Default values used when a setting is not specified
pub mod defaults {
    pub const RENDERING_DPI: u32 = 120;
    pub const POINTS_PER_INCH: u32 = 72; // PDF user space
    pub const BIT_THRESHOLD: u8 = 150;
    pub const BIT_MAX_VALUE: u8 = 255;
    pub const CANNY_THRESHOLD1: f32 = 50.0;
    pub const CANNY_THRESHOLD2: f32 = 200.0;
    pub const CANNY_APERTURE_SIZE: u8 = 3;
    pub const MIN_CELL_AREA: u32 = 1000; // px², at the rendering DPI
    pub const ROW_TOLERANCE: u32 = 0; // exact row-key match
    pub const DEBUG_FILE_PREFIX: &str = "debug";
}

/// Which contour level of the rule-line image is reported as a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellBoundary {
    /// Outermost contours only. Each closed, separate box is one cell.
    #[default]
    Outer,
    /// First-level holes inside outermost contours. Each enclosed interior
    /// of a connected rule network is one cell.
    Holes,
}

/// Immutable pipeline settings.
///
/// Built once per extraction session through [`Settings::builder`] or loaded
/// from TOML, then shared read-only by every pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    rendering_dpi: u32,
    points_per_inch: u32,
    bit_threshold: u8,
    bit_max_value: u8,
    canny_filtering: bool,
    canny_threshold1: f32,
    canny_threshold2: f32,
    canny_aperture_size: u8,
    canny_l2_gradient: bool,
    cell_boundary: CellBoundary,
    min_cell_area: u32,
    row_tolerance: u32,
    debug_images: bool,
    debug_output_dir: PathBuf,
    debug_file_prefix: String,
    pdfium_library_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rendering_dpi: defaults::RENDERING_DPI,
            points_per_inch: defaults::POINTS_PER_INCH,
            bit_threshold: defaults::BIT_THRESHOLD,
            bit_max_value: defaults::BIT_MAX_VALUE,
            canny_filtering: false,
            canny_threshold1: defaults::CANNY_THRESHOLD1,
            canny_threshold2: defaults::CANNY_THRESHOLD2,
            canny_aperture_size: defaults::CANNY_APERTURE_SIZE,
            canny_l2_gradient: false,
            cell_boundary: CellBoundary::Outer,
            min_cell_area: defaults::MIN_CELL_AREA,
            row_tolerance: defaults::ROW_TOLERANCE,
            debug_images: false,
            debug_output_dir: default_debug_dir(),
            debug_file_prefix: defaults::DEBUG_FILE_PREFIX.to_string(),
            pdfium_library_dir: None,
        }
    }
}

fn default_debug_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("pdftable").join("debug"))
        .unwrap_or_else(std::env::temp_dir)
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Builder seeded with these settings, for layering overrides.
    pub fn to_builder(&self) -> SettingsBuilder {
        SettingsBuilder {
            settings: self.clone(),
        }
    }

    /// Parse settings from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(source).map_err(|e| TableError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| TableError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// A copy of these settings with debug images enabled and redirected.
    pub fn with_debug_target(&self, dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            debug_images: true,
            debug_output_dir: dir.into(),
            debug_file_prefix: prefix.into(),
            ..self.clone()
        }
    }

    /// Document points per rendered pixel.
    pub fn dpi_ratio(&self) -> f64 {
        f64::from(self.points_per_inch) / f64::from(self.rendering_dpi)
    }

    pub fn rendering_dpi(&self) -> u32 {
        self.rendering_dpi
    }

    pub fn points_per_inch(&self) -> u32 {
        self.points_per_inch
    }

    pub fn bit_threshold(&self) -> u8 {
        self.bit_threshold
    }

    pub fn bit_max_value(&self) -> u8 {
        self.bit_max_value
    }

    pub fn has_canny_filtering(&self) -> bool {
        self.canny_filtering
    }

    pub fn canny_threshold1(&self) -> f32 {
        self.canny_threshold1
    }

    pub fn canny_threshold2(&self) -> f32 {
        self.canny_threshold2
    }

    pub fn canny_aperture_size(&self) -> u8 {
        self.canny_aperture_size
    }

    pub fn has_canny_l2_gradient(&self) -> bool {
        self.canny_l2_gradient
    }

    pub fn cell_boundary(&self) -> CellBoundary {
        self.cell_boundary
    }

    pub fn min_cell_area(&self) -> u32 {
        self.min_cell_area
    }

    pub fn row_tolerance(&self) -> u32 {
        self.row_tolerance
    }

    pub fn has_debug_images(&self) -> bool {
        self.debug_images
    }

    pub fn debug_output_dir(&self) -> &Path {
        &self.debug_output_dir
    }

    pub fn debug_file_prefix(&self) -> &str {
        &self.debug_file_prefix
    }

    pub fn pdfium_library_dir(&self) -> Option<&Path> {
        self.pdfium_library_dir.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if self.rendering_dpi == 0 {
            return Err(TableError::Config("rendering_dpi must be positive".into()));
        }
        if self.points_per_inch == 0 {
            return Err(TableError::Config("points_per_inch must be positive".into()));
        }
        if self.bit_max_value == 0 {
            return Err(TableError::Config("bit_max_value must be positive".into()));
        }
        if !(3..=7).contains(&self.canny_aperture_size) || self.canny_aperture_size % 2 == 0 {
            return Err(TableError::Config(format!(
                "canny_aperture_size must be 3, 5 or 7 (got {})",
                self.canny_aperture_size
            )));
        }
        // NaN thresholds must fail too
        let (low, high) = (self.canny_threshold1, self.canny_threshold2);
        if !(low >= 0.0 && low <= high) {
            return Err(TableError::Config(format!(
                "canny thresholds must satisfy 0 <= low <= high (got {} and {})",
                self.canny_threshold1, self.canny_threshold2
            )));
        }
        if self.debug_file_prefix.is_empty() {
            return Err(TableError::Config("debug_file_prefix must not be empty".into()));
        }
        Ok(())
    }
}

/// Builder for [`Settings`]; `build` validates the combination.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn rendering_dpi(mut self, dpi: u32) -> Self {
        self.settings.rendering_dpi = dpi;
        self
    }

    pub fn points_per_inch(mut self, points: u32) -> Self {
        self.settings.points_per_inch = points;
        self
    }

    pub fn bit_threshold(mut self, threshold: u8) -> Self {
        self.settings.bit_threshold = threshold;
        self
    }

    pub fn bit_max_value(mut self, max_value: u8) -> Self {
        self.settings.bit_max_value = max_value;
        self
    }

    pub fn canny_filtering(mut self, enabled: bool) -> Self {
        self.settings.canny_filtering = enabled;
        self
    }

    pub fn canny_thresholds(mut self, low: f32, high: f32) -> Self {
        self.settings.canny_threshold1 = low;
        self.settings.canny_threshold2 = high;
        self
    }

    pub fn canny_aperture_size(mut self, size: u8) -> Self {
        self.settings.canny_aperture_size = size;
        self
    }

    pub fn canny_l2_gradient(mut self, enabled: bool) -> Self {
        self.settings.canny_l2_gradient = enabled;
        self
    }

    pub fn cell_boundary(mut self, boundary: CellBoundary) -> Self {
        self.settings.cell_boundary = boundary;
        self
    }

    pub fn min_cell_area(mut self, area: u32) -> Self {
        self.settings.min_cell_area = area;
        self
    }

    pub fn row_tolerance(mut self, tolerance: u32) -> Self {
        self.settings.row_tolerance = tolerance;
        self
    }

    pub fn debug_images(mut self, enabled: bool) -> Self {
        self.settings.debug_images = enabled;
        self
    }

    pub fn debug_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.debug_output_dir = dir.into();
        self
    }

    pub fn debug_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.debug_file_prefix = prefix.into();
        self
    }

    pub fn pdfium_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.pdfium_library_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
