//! Scriptable camera for tests and demonstrations.
//!
//! Focus completion and frame delivery are dispatched through a
//! [`Scheduler`], so a [`ManualScheduler`](crate::session::ManualScheduler)
//! gives fully deterministic timings.

use super::{
    CameraBackend, CameraDevice, CameraError, CameraParameters, DeviceInfo, Facing,
    FocusCallback, PictureCallback, PixelFormat, RawFrame, Resolution, Surface,
};
use crate::session::Scheduler;
use image::{codecs::jpeg::JpegEncoder, ImageBuffer, Rgb};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How the fake responds to an auto-focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusScript {
    /// The callback fires after `delay` with the given outcome.
    CompleteAfter { delay: Duration, success: bool },
    /// The request is accepted but the callback never fires.
    Never,
    /// The request itself fails (e.g. hardware busy).
    FailRequest,
}

/// Counters and flags recorded by the fake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeStats {
    /// Index of the most recently opened device.
    pub opened: Option<usize>,
    /// Surface the preview is bound to.
    pub bound_surface: Option<Surface>,
    /// Last display orientation applied.
    pub display_orientation: Option<u32>,
    /// Whether the preview is running.
    pub previewing: bool,
    pub preview_starts: usize,
    pub preview_stops: usize,
    pub parameter_writes: usize,
    pub focus_cancels: usize,
    pub focus_requests: usize,
    /// Number of still-capture requests issued.
    pub picture_requests: usize,
    /// Number of times the device was released.
    pub releases: usize,
}

struct FakeState {
    params: CameraParameters,
    focus: FocusScript,
    frame: RawFrame,
    fail_open: bool,
    fail_bind: bool,
    released: bool,
    stats: FakeStats,
}

/// Fake camera backend that generates synthetic JPEG stills.
///
/// Clones share state, so a test can keep one clone for inspection while
/// the session owns another.
#[derive(Clone)]
pub struct FakeCamera {
    devices: Vec<DeviceInfo>,
    state: Arc<Mutex<FakeState>>,
    scheduler: Arc<dyn Scheduler>,
}

impl FakeCamera {
    /// Creates a fake with a front camera at index 0 and a rear camera
    /// (sensor orientation 90) at index 1.
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        let params = CameraParameters {
            preview_size: Some(Resolution::new(640, 480)),
            preview_format: Some(PixelFormat::Nv21),
            picture_size: None,
            picture_format: Some(PixelFormat::Jpeg),
            supported_preview_sizes: vec![
                Resolution::new(640, 480),
                Resolution::new(800, 600),
                Resolution::new(1280, 720),
            ],
            supported_preview_formats: vec![PixelFormat::Nv21, PixelFormat::Jpeg],
        };
        // Encoding into memory cannot fail for a valid RGB buffer; an empty
        // frame would only surface later as a decode failure.
        let frame = RawFrame::jpeg(synthetic_jpeg(32, 16).unwrap_or_default());

        Self {
            devices: vec![
                DeviceInfo {
                    index: 0,
                    facing: Facing::Front,
                    orientation: 270,
                },
                DeviceInfo {
                    index: 1,
                    facing: Facing::Back,
                    orientation: 90,
                },
            ],
            state: Arc::new(Mutex::new(FakeState {
                params,
                focus: FocusScript::CompleteAfter {
                    delay: Duration::from_millis(50),
                    success: true,
                },
                frame,
                fail_open: false,
                fail_bind: false,
                released: false,
                stats: FakeStats::default(),
            })),
            scheduler,
        }
    }

    /// Replaces the enumerated devices.
    pub fn with_devices(mut self, devices: Vec<DeviceInfo>) -> Self {
        self.devices = devices;
        self
    }

    /// Sets the auto-focus behavior.
    pub fn with_focus(self, focus: FocusScript) -> Self {
        self.set_focus(focus);
        self
    }

    /// Sets the frame returned by every still capture.
    pub fn with_frame(self, frame: RawFrame) -> Self {
        self.lock().frame = frame;
        self
    }

    /// Replaces the parameter set reported by the device.
    pub fn with_parameters(self, params: CameraParameters) -> Self {
        self.lock().params = params;
        self
    }

    /// Makes every `open` call fail.
    pub fn failing_open(self) -> Self {
        self.lock().fail_open = true;
        self
    }

    /// Makes surface binding fail.
    pub fn failing_bind(self) -> Self {
        self.lock().fail_bind = true;
        self
    }

    /// Changes the auto-focus behavior for subsequent requests.
    pub fn set_focus(&self, focus: FocusScript) {
        self.lock().focus = focus;
    }

    /// Returns a snapshot of the recorded counters.
    pub fn stats(&self) -> FakeStats {
        self.lock().stats.clone()
    }

    /// Returns the parameter set as last written.
    pub fn parameters_snapshot(&self) -> CameraParameters {
        self.lock().params.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<FakeState>) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CameraBackend for FakeCamera {
    fn devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }

    fn open(&self, index: usize) -> Result<Arc<dyn CameraDevice>, CameraError> {
        let mut state = self.lock();
        if state.fail_open || !self.devices.iter().any(|d| d.index == index) {
            return Err(CameraError::OpenFailed {
                index,
                reason: "device unavailable".into(),
            });
        }
        state.released = false;
        state.stats.opened = Some(index);
        tracing::info!(index, "FakeCamera opened");

        Ok(Arc::new(FakeDevice {
            state: Arc::clone(&self.state),
            scheduler: Arc::clone(&self.scheduler),
        }))
    }
}

struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
    scheduler: Arc<dyn Scheduler>,
}

impl FakeDevice {
    fn live(&self) -> Result<MutexGuard<'_, FakeState>, CameraError> {
        let state = lock_state(&self.state);
        if state.released {
            return Err(CameraError::Released);
        }
        Ok(state)
    }
}

impl CameraDevice for FakeDevice {
    fn bind(&self, surface: &Surface) -> Result<(), CameraError> {
        let mut state = self.live()?;
        if state.fail_bind {
            return Err(CameraError::BindFailed("surface not ready".into()));
        }
        state.stats.bound_surface = Some(*surface);
        Ok(())
    }

    fn set_display_orientation(&self, degrees: u32) -> Result<(), CameraError> {
        self.live()?.stats.display_orientation = Some(degrees);
        Ok(())
    }

    fn parameters(&self) -> Result<CameraParameters, CameraError> {
        Ok(self.live()?.params.clone())
    }

    fn set_parameters(&self, params: &CameraParameters) -> Result<(), CameraError> {
        let mut state = self.live()?;
        state.params = params.clone();
        state.stats.parameter_writes += 1;
        Ok(())
    }

    fn start_preview(&self) -> Result<(), CameraError> {
        let mut state = self.live()?;
        state.stats.previewing = true;
        state.stats.preview_starts += 1;
        Ok(())
    }

    fn stop_preview(&self) -> Result<(), CameraError> {
        let mut state = self.live()?;
        state.stats.previewing = false;
        state.stats.preview_stops += 1;
        Ok(())
    }

    fn cancel_auto_focus(&self) -> Result<(), CameraError> {
        self.live()?.stats.focus_cancels += 1;
        Ok(())
    }

    fn auto_focus(&self, on_focus: FocusCallback) -> Result<(), CameraError> {
        let script = {
            let mut state = self.live()?;
            state.stats.focus_requests += 1;
            state.focus
        };
        match script {
            FocusScript::CompleteAfter { delay, success } => {
                self.scheduler
                    .schedule(delay, Box::new(move || on_focus(success)));
                Ok(())
            }
            FocusScript::Never => Ok(()),
            FocusScript::FailRequest => Err(CameraError::FocusFailed("camera busy".into())),
        }
    }

    fn take_picture(&self, on_picture: PictureCallback) -> Result<(), CameraError> {
        let frame = {
            let mut state = self.live()?;
            state.stats.picture_requests += 1;
            state.frame.clone()
        };
        self.scheduler
            .schedule(Duration::ZERO, Box::new(move || on_picture(frame)));
        Ok(())
    }

    fn release(&self) {
        let mut state = lock_state(&self.state);
        state.released = true;
        state.stats.previewing = false;
        state.stats.releases += 1;
        tracing::info!("FakeCamera released");
    }
}

/// Encodes a synthetic gradient as a JPEG.
pub fn synthetic_jpeg(width: u32, height: u32) -> Result<Vec<u8>, image::ImageError> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        // Deterministic pattern, only for exercising the pipeline
        Rgb([(x * 8 % 256) as u8, (y * 8 % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new(&mut buf).encode_image(&img)?;
    Ok(buf)
}
