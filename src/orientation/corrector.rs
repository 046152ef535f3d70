//! Decode and rotate captured stills.

use crate::capture::{PixelFormat, RawFrame};
use image::{imageops, ImageFormat, RgbImage};
use thiserror::Error;

/// Errors that can occur while correcting orientation.
#[derive(Debug, Error)]
pub enum OrientationError {
    #[error("frame format {0:?} is not a compressed still")]
    UnsupportedFormat(PixelFormat),
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("rotation of {0} degrees is not a quarter turn")]
    InvalidRotation(u32),
}

/// A clockwise rotation by a whole number of quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Converts degrees to a rotation. Full turns are folded away; anything
    /// that is not a multiple of 90 is rejected.
    pub fn from_degrees(degrees: u32) -> Result<Self, OrientationError> {
        match degrees % 360 {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(OrientationError::InvalidRotation(degrees)),
        }
    }

    /// Returns the rotation in degrees.
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Returns the rotation equivalent to applying `self` then `next`.
    pub fn then(self, next: Rotation) -> Rotation {
        match (self.degrees() + next.degrees()) % 360 {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    /// Rotates `image` clockwise, consuming it.
    pub fn apply(self, image: RgbImage) -> RgbImage {
        match self {
            Rotation::Deg0 => image,
            Rotation::Deg90 => imageops::rotate90(&image),
            Rotation::Deg180 => imageops::rotate180(&image),
            Rotation::Deg270 => imageops::rotate270(&image),
        }
    }
}

/// A decoded still with the rotation that was applied to it.
#[derive(Clone)]
pub struct OrientedImage {
    pixels: RgbImage,
    rotation: Rotation,
}

impl OrientedImage {
    /// Wraps an already oriented buffer.
    pub fn new(pixels: RgbImage, rotation: Rotation) -> Self {
        Self { pixels, rotation }
    }

    /// Returns the pixel buffer.
    #[inline]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Returns the rotation that was applied.
    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Returns the image width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Returns the image height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

impl std::fmt::Debug for OrientedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrientedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("rotation", &self.rotation)
            .finish()
    }
}

/// Turns raw sensor output into an upright image.
///
/// Pixels are rotated by the sensor orientation itself. The preview uses
/// `(360 - orientation) % 360` instead (see
/// [`DeviceInfo::display_orientation`](crate::capture::DeviceInfo::display_orientation));
/// the two formulas are intentionally kept separate.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrientationCorrector;

impl OrientationCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Decodes `frame` and rotates it by `sensor_orientation` degrees.
    pub fn correct(
        &self,
        frame: &RawFrame,
        sensor_orientation: u32,
    ) -> Result<OrientedImage, OrientationError> {
        if !frame.is_compressed() {
            return Err(OrientationError::UnsupportedFormat(frame.format()));
        }
        let rotation = Rotation::from_degrees(sensor_orientation)?;

        let decoded = image::load_from_memory_with_format(frame.data(), ImageFormat::Jpeg)
            .map_err(|e| OrientationError::Decode(e.to_string()))?
            .into_rgb8();

        // The decoded buffer is consumed here and dropped by the rotation
        let pixels = rotation.apply(decoded);

        tracing::trace!(
            width = pixels.width(),
            height = pixels.height(),
            degrees = rotation.degrees(),
            "Frame oriented"
        );
        Ok(OrientedImage::new(pixels, rotation))
    }
}
