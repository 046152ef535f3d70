//! Camera abstraction for still capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera drivers and scripted fakes for testing.
//! Callbacks may be invoked on any thread, so every handle is `Send + Sync`
//! and takes `&self`.

use super::{CameraParameters, RawFrame};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no rear-facing camera available")]
    NoRearCamera,
    #[error("failed to open camera {index}: {reason}")]
    OpenFailed { index: usize, reason: String },
    #[error("failed to bind preview surface: {0}")]
    BindFailed(String),
    #[error("camera rejected parameters: {0}")]
    ParametersRejected(String),
    #[error("auto-focus request failed: {0}")]
    FocusFailed(String),
    #[error("failed to take picture: {0}")]
    CaptureFailed(String),
    #[error("camera has been released")]
    Released,
}

/// Which way a camera faces relative to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Faces away from the user.
    Back,
    /// Faces the user.
    Front,
}

/// Enumeration metadata for one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Index used to open the device.
    pub index: usize,
    /// Facing direction.
    pub facing: Facing,
    /// Mounting orientation of the sensor in degrees (0, 90, 180 or 270).
    pub orientation: u32,
}

impl DeviceInfo {
    /// Rotation to apply to the live preview: `(360 - orientation) % 360`.
    pub fn display_orientation(&self) -> u32 {
        (360 - self.orientation % 360) % 360
    }
}

/// Opaque handle to the display surface the preview renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    id: u64,
}

impl Surface {
    /// Wraps a platform surface identifier.
    pub const fn new(id: u64) -> Self {
        Self { id }
    }

    /// Returns the platform surface identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Invoked once with the auto-focus outcome (`true` if focus locked).
pub type FocusCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Invoked once with the captured still frame.
pub type PictureCallback = Box<dyn FnOnce(RawFrame) + Send + 'static>;

/// Enumerates and opens camera devices.
pub trait CameraBackend: Send + Sync {
    /// Lists the cameras present on the system.
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Opens the camera at `index`.
    fn open(&self, index: usize) -> Result<Arc<dyn CameraDevice>, CameraError>;
}

/// An opened camera handle.
pub trait CameraDevice: Send + Sync {
    /// Binds the preview output to a display surface.
    fn bind(&self, surface: &Surface) -> Result<(), CameraError>;

    /// Sets the clockwise rotation of the live preview, in degrees.
    fn set_display_orientation(&self, degrees: u32) -> Result<(), CameraError>;

    /// Returns a copy of the current parameter set.
    fn parameters(&self) -> Result<CameraParameters, CameraError>;

    /// Applies a parameter set.
    fn set_parameters(&self, params: &CameraParameters) -> Result<(), CameraError>;

    /// Starts the live preview feed.
    fn start_preview(&self) -> Result<(), CameraError>;

    /// Stops the live preview feed.
    fn stop_preview(&self) -> Result<(), CameraError>;

    /// Cancels any auto-focus in progress.
    fn cancel_auto_focus(&self) -> Result<(), CameraError>;

    /// Starts auto-focus; `on_focus` fires when it completes, possibly never.
    fn auto_focus(&self, on_focus: FocusCallback) -> Result<(), CameraError>;

    /// Captures a still picture; `on_picture` receives the frame.
    fn take_picture(&self, on_picture: PictureCallback) -> Result<(), CameraError>;

    /// Releases the hardware. Further calls fail with [`CameraError::Released`].
    fn release(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(orientation: u32) -> DeviceInfo {
        DeviceInfo {
            index: 0,
            facing: Facing::Back,
            orientation,
        }
    }

    #[test]
    fn test_display_orientation() {
        assert_eq!(info(0).display_orientation(), 0);
        assert_eq!(info(90).display_orientation(), 270);
        assert_eq!(info(180).display_orientation(), 180);
        assert_eq!(info(270).display_orientation(), 90);
    }

    #[test]
    fn test_display_orientation_wraps_full_turn() {
        assert_eq!(info(360).display_orientation(), 0);
    }
}
