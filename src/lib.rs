//! Still Capture Library
//!
//! Decision logic for a device's still-image capture pipeline: which
//! configuration to request from the camera, when to trigger the capture,
//! how to orient the result and where to store it.
//!
//! # Architecture
//!
//! ```text
//! selection ──► session ──► camera (capture::CameraDevice)
//!                  │               │ frame
//!                  │               ▼
//!                  └──────► orientation ──► storage
//! ```
//!
//! # Design Principles
//!
//! - **Exactly one still per capture call**: auto-focus completion and a
//!   fallback timer race; a check-and-set flag lets only the first through
//! - **Framing before size**: aspect-matching sizes are preferred, with a
//!   height-only fallback so a usable size always exists
//! - **Best effort persistence**: decode and storage failures are logged,
//!   never surfaced to the control thread, and always clear the in-flight flag
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use still_capture::{
//!     capture::{CaptureConfig, FakeCamera, PixelFormat, Surface, Viewport},
//!     orientation::OrientationCorrector,
//!     session::{CapturePipeline, SessionController, ThreadScheduler},
//!     storage::{CaptureSink, DirectoryMedium, SystemClock},
//! };
//!
//! let config = CaptureConfig::default();
//! let scheduler = Arc::new(ThreadScheduler::new());
//! let camera = Arc::new(FakeCamera::new(scheduler.clone()));
//! let sink = CaptureSink::new(
//!     Arc::new(DirectoryMedium::new("/sdcard")),
//!     Arc::new(SystemClock),
//!     config.subdirectory.clone(),
//!     config.jpeg_quality,
//! );
//! let pipeline = CapturePipeline::new(OrientationCorrector::new(), sink);
//!
//! let mut session = SessionController::new(camera, scheduler, pipeline, config);
//! session.attach(&Surface::new(1)).unwrap();
//! session.configure(Some(Viewport::new(1280, 720)), PixelFormat::Nv21).unwrap();
//! session.start_preview().unwrap();
//! session.capture().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod metrics;
pub mod orientation;
pub mod selection;
pub mod session;
pub mod storage;

// Re-export commonly used types at crate root
pub use capture::{
    CameraBackend, CameraDevice, CaptureConfig, PixelFormat, RawFrame, Resolution, Viewport,
};
pub use orientation::{OrientationCorrector, OrientedImage, Rotation};
pub use selection::select_optimal;
pub use session::{CaptureStart, Phase, SessionController, SessionError};
pub use storage::{CaptureSink, StorageError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
