//! Persisting oriented stills as JPEG files.
//!
//! Artifacts are written to `{root}/{subdirectory}/{unix_millis}.jpg`.
//! Names are only unique to the millisecond: two stores within the same
//! millisecond write the same path and the later one wins.

use super::Clock;
use crate::orientation::OrientedImage;
use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while storing an artifact.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage medium is not mounted")]
    Unavailable,
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode JPEG: {0}")]
    Encode(String),
}

/// The durable medium artifacts are written to.
pub trait StorageMedium: Send + Sync {
    /// Returns true if the medium is mounted and writable.
    fn is_mounted(&self) -> bool;

    /// Root directory of the medium.
    fn root(&self) -> &Path;
}

/// A medium rooted at a local directory; mounted while the directory exists.
#[derive(Debug, Clone)]
pub struct DirectoryMedium {
    root: PathBuf,
}

impl DirectoryMedium {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageMedium for DirectoryMedium {
    fn is_mounted(&self) -> bool {
        self.root.is_dir()
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// Writes oriented images to durable storage.
pub struct CaptureSink {
    medium: Arc<dyn StorageMedium>,
    clock: Arc<dyn Clock>,
    subdirectory: String,
    quality: u8,
}

impl CaptureSink {
    /// Creates a sink writing under `{root}/{subdirectory}` at the given
    /// JPEG quality.
    pub fn new(
        medium: Arc<dyn StorageMedium>,
        clock: Arc<dyn Clock>,
        subdirectory: impl Into<String>,
        quality: u8,
    ) -> Self {
        Self {
            medium,
            clock,
            subdirectory: subdirectory.into(),
            quality: quality.clamp(1, 100),
        }
    }

    /// Returns true if the medium is ready to receive artifacts.
    pub fn is_available(&self) -> bool {
        self.medium.is_mounted()
    }

    /// Path an artifact captured at `millis` is written to.
    pub fn artifact_path(&self, millis: i64) -> PathBuf {
        self.medium
            .root()
            .join(&self.subdirectory)
            .join(format!("{millis}.jpg"))
    }

    /// Writes `image` and returns its path.
    ///
    /// Nothing is attempted when the medium is not mounted. The file
    /// handle is closed before this returns, on success and on failure.
    pub fn store(&self, image: &OrientedImage) -> Result<PathBuf, StorageError> {
        if !self.is_available() {
            return Err(StorageError::Unavailable);
        }

        let path = self.artifact_path(self.clock.now_millis());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.write_jpeg(&path, image)?;

        tracing::info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Artifact stored"
        );
        Ok(path)
    }

    fn write_jpeg(&self, path: &Path, image: &OrientedImage) -> Result<(), StorageError> {
        let mut writer = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(image.pixels())
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink")
            .field("root", &self.medium.root())
            .field("subdirectory", &self.subdirectory)
            .field("quality", &self.quality)
            .finish()
    }
}
