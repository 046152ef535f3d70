//! Capture parameter types exchanged with the hardware.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame size in pixels, as reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a new resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `width / height`.
    ///
    /// A zero height yields an infinite or NaN ratio, which never falls
    /// inside an aspect tolerance.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The display region the preview must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Used when the display size cannot be determined.
    pub const FALLBACK: Viewport = Viewport::new(50, 50);

    /// Creates a new viewport.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl From<Viewport> for Resolution {
    fn from(viewport: Viewport) -> Self {
        Resolution::new(viewport.width, viewport.height)
    }
}

/// Pixel formats a camera may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// JPEG compressed stills.
    Jpeg,
    /// YCrCb 4:2:0 semi-planar, the usual preview format.
    Nv21,
    /// YUV 4:2:2 packed.
    Yuy2,
    /// 16-bit RGB.
    Rgb565,
}

impl PixelFormat {
    /// Returns true for lossy-compressed formats accepted downstream.
    pub fn is_compressed(&self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }
}

/// Parameter set read from and written back to a camera device.
///
/// Mirrors the get/modify/set cycle of the hardware: callers fetch a copy,
/// adjust the applied fields and hand it back through
/// [`CameraDevice::set_parameters`](super::CameraDevice::set_parameters).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraParameters {
    /// Currently applied preview size.
    pub preview_size: Option<Resolution>,
    /// Currently applied preview format.
    pub preview_format: Option<PixelFormat>,
    /// Currently applied still-picture size.
    pub picture_size: Option<Resolution>,
    /// Format still pictures are delivered in.
    pub picture_format: Option<PixelFormat>,
    /// Preview sizes the device supports, in device order.
    pub supported_preview_sizes: Vec<Resolution>,
    /// Preview formats the device supports, in device order.
    pub supported_preview_formats: Vec<PixelFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let res = Resolution::new(1280, 720);
        assert!((res.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_height_ratio_is_not_finite() {
        assert!(!Resolution::new(640, 0).aspect_ratio().is_finite());
    }

    #[test]
    fn test_only_jpeg_is_compressed() {
        assert!(PixelFormat::Jpeg.is_compressed());
        assert!(!PixelFormat::Nv21.is_compressed());
        assert!(!PixelFormat::Rgb565.is_compressed());
    }
}
