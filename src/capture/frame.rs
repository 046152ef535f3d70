//! Raw still frame as delivered by the hardware.

use super::PixelFormat;

/// Bytes handed over by the picture callback, with their declared format.
///
/// Only compressed frames ([`PixelFormat::Jpeg`]) are accepted by the
/// orientation and storage stages.
#[derive(Clone)]
pub struct RawFrame {
    data: Vec<u8>,
    format: PixelFormat,
}

impl RawFrame {
    /// Creates a frame with the given payload and declared format.
    pub fn new(data: Vec<u8>, format: PixelFormat) -> Self {
        Self { data, format }
    }

    /// Creates a JPEG frame.
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self::new(data, PixelFormat::Jpeg)
    }

    /// Returns the encoded bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the declared pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns true if the frame is in a format the pipeline accepts.
    pub fn is_compressed(&self) -> bool {
        self.format.is_compressed()
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = RawFrame::jpeg(vec![0xFF, 0xD8, 0xFF]);

        assert_eq!(frame.format(), PixelFormat::Jpeg);
        assert_eq!(frame.data().len(), 3);
        assert!(frame.is_compressed());
    }

    #[test]
    fn test_uncompressed_frame() {
        let frame = RawFrame::new(vec![0u8; 16], PixelFormat::Nv21);
        assert!(!frame.is_compressed());
    }
}
