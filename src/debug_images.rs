// Debug image output for the detection stages
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::GrayImage;

use crate::config::Settings;
use crate::error::{Result, TableError};

pub const ORIGINAL_GRAYSCALED: &str = "original_grayscaled";
pub const BINARY_INVERTED_THRESHOLD: &str = "binary_inverted_threshold";
pub const CANNY: &str = "canny1";

/// Destination for per-stage debug images.
pub trait DebugSink {
    fn write_image(&self, stage: &str, image: &GrayImage) -> Result<()>;
}

/// Writes `<prefix>_<stage>.png` into a directory, overwriting earlier runs.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    prefix: String,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.debug_output_dir(), settings.debug_file_prefix())
    }

    pub fn path_for(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.png", self.prefix, stage))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DebugSink for DirectorySink {
    fn write_image(&self, stage: &str, image: &GrayImage) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(stage);
        image
            .save(&path)
            .map_err(|source| TableError::DebugWrite { path, source })
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn write_image(&self, _stage: &str, _image: &GrayImage) -> Result<()> {
        Ok(())
    }
}

/// Keeps the stage names it was asked to write.
#[derive(Debug, Default)]
pub struct RecordingSink {
    stages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<String> {
        match self.stages.lock() {
            Ok(stages) => stages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut stages) = self.stages.lock() {
            stages.clear();
        }
    }
}

impl DebugSink for RecordingSink {
    fn write_image(&self, stage: &str, _image: &GrayImage) -> Result<()> {
        self.stages
            .lock()
            .map_err(|_| TableError::LockPoisoned)?
            .push(stage.to_string());
        Ok(())
    }
}
