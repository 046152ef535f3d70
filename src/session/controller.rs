//! Preview and capture lifecycle control.
//!
//! # Capture protocol
//!
//! [`SessionController::capture`] cancels any running auto-focus, requests
//! a new one and arms a fallback timer. Whichever of the focus callback or
//! the timer fires first issues the still capture; the other finds the
//! capture already released and does nothing. A focus request the hardware
//! rejects is logged and the timer alone drives the capture.
//!
//! The delivered frame is persisted on a worker context. The in-flight
//! flag is cleared only once persistence has finished and its file handle
//! is closed, whether it succeeded or not.

use super::pipeline::CapturePipeline;
use super::state::{Arm, CaptureSession, Phase, SessionShared};
use super::Scheduler;
use crate::capture::{
    CameraBackend, CameraDevice, CameraError, CaptureConfig, DeviceInfo, Facing, PixelFormat,
    RawFrame, Resolution, Surface, Viewport,
};
use crate::metrics::{CaptureMetrics, TriggerSource};
use crate::selection::{apply_preferred_format, apply_preferred_size, select_optimal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to attach camera: {0}")]
    Attach(#[source] CameraError),
    #[error("no camera attached")]
    NotAttached,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("cannot {operation} while {actual:?}")]
    InvalidPhase {
        operation: &'static str,
        actual: Phase,
    },
    #[error("camera error: {0}")]
    Hardware(#[from] CameraError),
}

/// Outcome of a [`SessionController::capture`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStart {
    /// The focus/fallback race was armed; exactly one still will be taken.
    Armed,
    /// A capture was already pending or being persisted; nothing was done.
    Ignored,
}

/// The configuration applied by [`SessionController::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedConfiguration {
    /// Preview size now in effect.
    pub preview_size: Resolution,
    /// Requested preview format, if the device supported it.
    pub preview_format: Option<PixelFormat>,
    /// Still-picture size now in effect.
    pub picture_size: Resolution,
}

/// Drives one camera through preview and capture.
pub struct SessionController {
    backend: Arc<dyn CameraBackend>,
    scheduler: Arc<dyn Scheduler>,
    pipeline: Arc<CapturePipeline>,
    config: CaptureConfig,
    metrics: Option<Arc<CaptureMetrics>>,
    session: Option<CaptureSession>,
}

impl SessionController {
    /// Creates a detached controller.
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        scheduler: Arc<dyn Scheduler>,
        pipeline: CapturePipeline,
        config: CaptureConfig,
    ) -> Self {
        Self {
            backend,
            scheduler,
            pipeline: Arc::new(pipeline),
            config,
            metrics: None,
            session: None,
        }
    }

    /// Records protocol and persist outcomes into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<CaptureMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the active session, if attached.
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Returns true if a camera is attached.
    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// Current phase; `Idle` when detached.
    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, CaptureSession::phase)
    }

    /// Whether a capture is issued and not yet persisted.
    pub fn is_capture_in_flight(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(CaptureSession::capture_in_flight)
    }

    /// Opens the first rear-facing camera and binds it to `surface`.
    ///
    /// Does nothing if already attached. If binding fails the camera is
    /// released again and the controller stays detached.
    pub fn attach(&mut self, surface: &Surface) -> Result<(), SessionError> {
        if self.session.is_some() {
            tracing::debug!("Camera already attached");
            return Ok(());
        }

        let info = self
            .backend
            .devices()
            .into_iter()
            .find(|d| d.facing == Facing::Back)
            .ok_or(SessionError::Attach(CameraError::NoRearCamera))?;
        let device = self.backend.open(info.index).map_err(SessionError::Attach)?;

        if let Err(e) = bind(device.as_ref(), &info, surface) {
            tracing::warn!(error = %e, index = info.index, "Failed to bind camera, releasing");
            device.release();
            return Err(SessionError::Attach(e));
        }

        tracing::info!(
            index = info.index,
            orientation = info.orientation,
            display_orientation = info.display_orientation(),
            "Camera attached"
        );
        self.session = Some(CaptureSession::new(device, info));
        Ok(())
    }

    /// Applies preview size, preview format and picture size for `viewport`
    /// (the configured fallback viewport when `None`).
    ///
    /// Stops a running preview; call [`start_preview`](Self::start_preview)
    /// afterwards. Re-invoking with the same arguments yields the same
    /// configuration.
    pub fn configure(
        &mut self,
        viewport: Option<Viewport>,
        format: PixelFormat,
    ) -> Result<AppliedConfiguration, SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NotAttached)?;
        let target = viewport.unwrap_or(self.config.fallback_viewport);
        let tolerance = self.config.aspect_tolerance;
        let device = &session.device;

        match session.phase() {
            Phase::Idle => {}
            Phase::Previewing => {
                device.stop_preview()?;
                session.shared.set_phase(Phase::Idle);
            }
            actual => {
                return Err(SessionError::InvalidPhase {
                    operation: "configure",
                    actual,
                })
            }
        }

        let mut params = device.parameters()?;
        let preview_size = match apply_preferred_size(&mut params, target.into()) {
            Some(size) => size,
            None => {
                let size = select_optimal(&params.supported_preview_sizes, target, tolerance)
                    .ok_or_else(no_sizes)?;
                params.preview_size = Some(size);
                size
            }
        };
        let preview_format = apply_preferred_format(&mut params, format);
        if preview_format.is_none() {
            tracing::debug!(?format, "Preview format not supported, keeping current");
        }
        device.set_parameters(&params)?;

        // Picture size is derived from a fresh read of what the device accepted
        let mut params = device.parameters()?;
        let picture_size = select_optimal(&params.supported_preview_sizes, target, tolerance)
            .ok_or_else(no_sizes)?;
        params.picture_size = Some(picture_size);
        device.set_parameters(&params)?;

        tracing::info!(
            preview = %preview_size,
            picture = %picture_size,
            ?preview_format,
            "Camera configured"
        );
        Ok(AppliedConfiguration {
            preview_size,
            preview_format,
            picture_size,
        })
    }

    /// Starts the live preview. Does nothing if it is already running.
    pub fn start_preview(&mut self) -> Result<(), SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NotAttached)?;
        if session.phase() != Phase::Idle {
            tracing::debug!(phase = ?session.phase(), "Preview already running");
            return Ok(());
        }
        session.device.start_preview()?;
        session.shared.set_phase(Phase::Previewing);
        tracing::info!("Preview started");
        Ok(())
    }

    /// Takes one still picture, preferring a focused shot.
    ///
    /// Requires a running preview. Returns [`CaptureStart::Ignored`] while
    /// a previous capture is still pending or being persisted.
    pub fn capture(&mut self) -> Result<CaptureStart, SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NotAttached)?;

        match session.shared.try_arm() {
            Arm::Armed => {}
            Arm::AlreadyPending => {
                tracing::debug!("Capture already in flight, ignoring");
                if let Some(metrics) = &self.metrics {
                    metrics.record_ignored();
                }
                return Ok(CaptureStart::Ignored);
            }
            Arm::NotPreviewing(actual) => {
                return Err(SessionError::InvalidPhase {
                    operation: "capture",
                    actual,
                })
            }
        }

        let pending = Arc::new(PendingCapture {
            released: AtomicBool::new(false),
            device: Arc::clone(&session.device),
            info: session.info,
            shared: Arc::clone(&session.shared),
            pipeline: Arc::clone(&self.pipeline),
            scheduler: Arc::clone(&self.scheduler),
            metrics: self.metrics.clone(),
        });

        if let Err(e) = session.device.cancel_auto_focus() {
            tracing::warn!(error = %e, "Failed to cancel auto-focus");
        }

        let on_focus = Arc::clone(&pending);
        let requested = session.device.auto_focus(Box::new(move |focused: bool| {
            tracing::trace!(focused, "Auto-focus completed");
            on_focus.trigger(TriggerSource::Focus);
        }));
        if let Err(e) = requested {
            tracing::warn!(error = %e, "Auto-focus request failed, relying on fallback timer");
            if let Some(metrics) = &self.metrics {
                metrics.record_focus_failure();
            }
        }

        let on_timeout = Arc::clone(&pending);
        self.scheduler.schedule(
            self.config.focus_fallback(),
            Box::new(move || on_timeout.trigger(TriggerSource::Fallback)),
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_request();
        }
        Ok(CaptureStart::Armed)
    }

    /// Stops the preview and releases the camera.
    ///
    /// Safe to call repeatedly or when never attached. Pending timers and
    /// persist work from the released session become no-ops.
    pub fn detach(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.phase() != Phase::Idle {
            if let Err(e) = session.device.stop_preview() {
                tracing::warn!(error = %e, "Failed to stop preview");
            }
        }
        session.shared.set_phase(Phase::Idle);
        session.device.release();
        tracing::info!(index = session.info.index, "Camera detached");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}

fn bind(device: &dyn CameraDevice, info: &DeviceInfo, surface: &Surface) -> Result<(), CameraError> {
    device.set_display_orientation(info.display_orientation())?;
    device.bind(surface)
}

fn no_sizes() -> SessionError {
    SessionError::Configuration("camera reports no supported preview sizes".into())
}

/// One armed capture: the focus callback and the fallback timer each hold
/// a reference and race to release it.
struct PendingCapture {
    released: AtomicBool,
    device: Arc<dyn CameraDevice>,
    info: DeviceInfo,
    shared: Arc<SessionShared>,
    pipeline: Arc<CapturePipeline>,
    scheduler: Arc<dyn Scheduler>,
    metrics: Option<Arc<CaptureMetrics>>,
}

impl PendingCapture {
    fn trigger(self: &Arc<Self>, source: TriggerSource) {
        if self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(source = source.as_str(), "Capture already released");
            return;
        }
        if !self.shared.begin_capture() {
            tracing::debug!(source = source.as_str(), "Session no longer awaiting focus");
            return;
        }

        tracing::debug!(source = source.as_str(), "Taking picture");
        if let Some(metrics) = &self.metrics {
            metrics.record_trigger(source);
        }

        let on_picture = Arc::clone(self);
        let taken = self
            .device
            .take_picture(Box::new(move |frame: RawFrame| on_picture.deliver(frame)));
        if let Err(e) = taken {
            tracing::warn!(error = %e, "Failed to take picture");
            self.shared.abort_capture();
            if let Some(metrics) = &self.metrics {
                metrics.record_abandoned();
            }
        }
    }

    fn deliver(&self, frame: RawFrame) {
        self.shared.frame_delivered();

        if !frame.is_compressed() {
            tracing::debug!(format = ?frame.format(), "Dropping uncompressed frame");
            self.shared.finish_capture();
            if let Some(metrics) = &self.metrics {
                metrics.record_abandoned();
            }
            return;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let shared = Arc::clone(&self.shared);
        let metrics = self.metrics.clone();
        let orientation = self.info.orientation;

        self.scheduler.spawn(Box::new(move || {
            let stored = match pipeline.persist(&frame, orientation) {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), "Capture persisted");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to persist capture");
                    false
                }
            };
            shared.finish_capture();
            if let Some(metrics) = metrics {
                metrics.record_persisted(stored);
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraParameters, FakeCamera};
    use crate::orientation::OrientationCorrector;
    use crate::session::ManualScheduler;
    use crate::storage::{CaptureSink, DirectoryMedium, FixedClock};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        camera: FakeCamera,
        controller: SessionController,
    }

    fn harness_with(configure: impl FnOnce(FakeCamera) -> FakeCamera) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(ManualScheduler::new());
        let camera = configure(FakeCamera::new(scheduler.clone()));
        let sink = CaptureSink::new(
            Arc::new(DirectoryMedium::new(dir.path())),
            Arc::new(FixedClock::new(1)),
            "CameraTest",
            50,
        );
        let controller = SessionController::new(
            Arc::new(camera.clone()),
            scheduler,
            CapturePipeline::new(OrientationCorrector::new(), sink),
            CaptureConfig::default(),
        );
        Harness {
            _dir: dir,
            camera,
            controller,
        }
    }

    fn harness() -> Harness {
        harness_with(|camera| camera)
    }

    #[test]
    fn test_attach_opens_rear_camera() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();

        let stats = h.camera.stats();
        assert_eq!(stats.opened, Some(1));
        // Rear sensor is mounted at 90 degrees
        assert_eq!(stats.display_orientation, Some(270));
        assert_eq!(stats.bound_surface, Some(Surface::new(1)));
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(h.controller.is_attached());
    }

    #[test]
    fn test_attach_without_rear_camera() {
        let mut h = harness_with(|camera| {
            camera.with_devices(vec![DeviceInfo {
                index: 0,
                facing: Facing::Front,
                orientation: 270,
            }])
        });

        let result = h.controller.attach(&Surface::new(1));
        assert!(matches!(
            result,
            Err(SessionError::Attach(CameraError::NoRearCamera))
        ));
        assert!(!h.controller.is_attached());
    }

    #[test]
    fn test_bind_failure_releases_handle() {
        let mut h = harness_with(FakeCamera::failing_bind);

        let result = h.controller.attach(&Surface::new(1));
        assert!(matches!(
            result,
            Err(SessionError::Attach(CameraError::BindFailed(_)))
        ));
        assert_eq!(h.camera.stats().releases, 1);
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(!h.controller.is_attached());
    }

    #[test]
    fn test_open_failure_is_attach_failure() {
        let mut h = harness_with(FakeCamera::failing_open);
        assert!(matches!(
            h.controller.attach(&Surface::new(1)),
            Err(SessionError::Attach(CameraError::OpenFailed { .. }))
        ));
    }

    #[test]
    fn test_configure_requires_attach() {
        let mut h = harness();
        assert!(matches!(
            h.controller.configure(None, PixelFormat::Nv21),
            Err(SessionError::NotAttached)
        ));
    }

    #[test]
    fn test_configure_exact_preview_and_optimal_picture() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();

        let applied = h
            .controller
            .configure(Some(Viewport::new(800, 600)), PixelFormat::Jpeg)
            .unwrap();

        assert_eq!(applied.preview_size, Resolution::new(800, 600));
        assert_eq!(applied.preview_format, Some(PixelFormat::Jpeg));
        assert_eq!(applied.picture_size, Resolution::new(800, 600));

        let params = h.camera.parameters_snapshot();
        assert_eq!(params.preview_size, Some(Resolution::new(800, 600)));
        assert_eq!(params.picture_size, Some(Resolution::new(800, 600)));
    }

    #[test]
    fn test_configure_selects_when_no_exact_match() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();

        let applied = h
            .controller
            .configure(Some(Viewport::new(1270, 720)), PixelFormat::Rgb565)
            .unwrap();

        assert_eq!(applied.preview_size, Resolution::new(1280, 720));
        assert_eq!(applied.picture_size, Resolution::new(1280, 720));
        assert_eq!(applied.preview_format, None);
        assert_eq!(
            h.camera.parameters_snapshot().preview_format,
            Some(PixelFormat::Nv21)
        );
    }

    #[test]
    fn test_configure_uses_fallback_viewport() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();

        // 50x50 matches no aspect ratio; closest height is 480
        let applied = h.controller.configure(None, PixelFormat::Nv21).unwrap();
        assert_eq!(applied.picture_size, Resolution::new(640, 480));
    }

    #[test]
    fn test_configure_is_idempotent() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();

        let viewport = Some(Viewport::new(1270, 720));
        let first = h.controller.configure(viewport, PixelFormat::Nv21).unwrap();
        let params = h.camera.parameters_snapshot();
        let second = h.controller.configure(viewport, PixelFormat::Nv21).unwrap();

        assert_eq!(first, second);
        assert_eq!(params, h.camera.parameters_snapshot());
    }

    #[test]
    fn test_configure_without_sizes_is_configuration_error() {
        let mut h = harness_with(|camera| camera.with_parameters(CameraParameters::default()));
        h.controller.attach(&Surface::new(1)).unwrap();

        assert!(matches!(
            h.controller.configure(None, PixelFormat::Nv21),
            Err(SessionError::Configuration(_))
        ));
    }

    #[test]
    fn test_configure_stops_running_preview() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();
        h.controller.start_preview().unwrap();

        h.controller.configure(None, PixelFormat::Nv21).unwrap();

        assert_eq!(h.camera.stats().preview_stops, 1);
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_capture_requires_preview() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();

        assert!(matches!(
            h.controller.capture(),
            Err(SessionError::InvalidPhase {
                actual: Phase::Idle,
                ..
            })
        ));
    }

    #[test]
    fn test_start_preview_twice_starts_once() {
        let mut h = harness();
        h.controller.attach(&Surface::new(1)).unwrap();
        h.controller.start_preview().unwrap();
        h.controller.start_preview().unwrap();

        assert_eq!(h.camera.stats().preview_starts, 1);
        assert_eq!(h.controller.phase(), Phase::Previewing);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut h = harness();
        h.controller.detach();

        h.controller.attach(&Surface::new(1)).unwrap();
        h.controller.start_preview().unwrap();
        h.controller.detach();
        h.controller.detach();

        let stats = h.camera.stats();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.preview_stops, 1);
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(!h.controller.is_attached());
    }
}
