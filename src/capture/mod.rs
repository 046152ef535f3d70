//! Camera hardware abstraction and capture configuration.
//!
//! This module defines the capability set the session drives (enumerate,
//! open, bind, parameters, preview, focus, take picture, release), the
//! data exchanged with it, and a scriptable fake for tests.

mod camera;
mod config;
mod fake;
mod frame;
mod params;

pub use camera::{
    CameraBackend, CameraDevice, CameraError, DeviceInfo, Facing, FocusCallback,
    PictureCallback, Surface,
};
pub use config::{CaptureConfig, ConfigError, FileConfig, StorageConfig};
pub use fake::{synthetic_jpeg, FakeCamera, FakeStats, FocusScript};
pub use frame::RawFrame;
pub use params::{CameraParameters, PixelFormat, Resolution, Viewport};
