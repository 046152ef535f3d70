//! Frame persistence: orientation correction followed by storage.

use crate::capture::RawFrame;
use crate::orientation::{OrientationCorrector, OrientationError};
use crate::storage::{CaptureSink, StorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting a frame.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Orientation(#[from] OrientationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Decodes, rotates and stores delivered frames.
#[derive(Debug)]
pub struct CapturePipeline {
    corrector: OrientationCorrector,
    sink: CaptureSink,
}

impl CapturePipeline {
    pub fn new(corrector: OrientationCorrector, sink: CaptureSink) -> Self {
        Self { corrector, sink }
    }

    /// Returns the storage sink.
    pub fn sink(&self) -> &CaptureSink {
        &self.sink
    }

    /// Persists one frame.
    ///
    /// Nothing is decoded when storage is unavailable. The decoded image is
    /// dropped and the output file closed before this returns.
    pub fn persist(
        &self,
        frame: &RawFrame,
        sensor_orientation: u32,
    ) -> Result<PathBuf, PersistError> {
        if !self.sink.is_available() {
            return Err(StorageError::Unavailable.into());
        }
        let image = self.corrector.correct(frame, sensor_orientation)?;
        Ok(self.sink.store(&image)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic_jpeg;
    use crate::storage::{DirectoryMedium, FixedClock};
    use std::path::Path;
    use std::sync::Arc;

    fn pipeline(root: &Path) -> CapturePipeline {
        let sink = CaptureSink::new(
            Arc::new(DirectoryMedium::new(root)),
            Arc::new(FixedClock::new(1000)),
            "CameraTest",
            50,
        );
        CapturePipeline::new(OrientationCorrector::new(), sink)
    }

    #[test]
    fn test_persist_writes_rotated_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let frame = RawFrame::jpeg(synthetic_jpeg(32, 16).unwrap());

        let path = pipeline(dir.path()).persist(&frame, 90).unwrap();

        let stored = image::open(&path).unwrap();
        assert_eq!((stored.width(), stored.height()), (16, 32));
    }

    #[test]
    fn test_decode_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let frame = RawFrame::jpeg(vec![0u8; 10]);

        let result = pipeline(dir.path()).persist(&frame, 90);

        assert!(matches!(
            result,
            Err(PersistError::Orientation(OrientationError::Decode(_)))
        ));
        assert!(!dir.path().join("CameraTest").exists());
    }

    #[test]
    fn test_unavailable_storage_skips_decode() {
        let dir = tempfile::tempdir().unwrap();
        // Garbage would fail decoding, but storage is checked first
        let frame = RawFrame::jpeg(vec![0u8; 10]);

        let result = pipeline(&dir.path().join("missing")).persist(&frame, 0);
        assert!(matches!(
            result,
            Err(PersistError::Storage(StorageError::Unavailable))
        ));
    }
}
