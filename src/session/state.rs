//! Session lifecycle state shared with hardware callbacks.

use crate::capture::{CameraDevice, DeviceInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle phase of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Attached (or not) with no preview running.
    #[default]
    Idle,
    /// Live preview running, ready to capture.
    Previewing,
    /// Capture requested, waiting for focus or the fallback timer.
    AwaitingFocus,
    /// Still capture issued, waiting for the frame.
    Capturing,
}

/// Result of trying to arm a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arm {
    Armed,
    AlreadyPending,
    NotPreviewing(Phase),
}

/// State reachable from both the control thread and callback contexts.
#[derive(Debug, Default)]
pub(crate) struct SessionShared {
    phase: Mutex<Phase>,
    capture_in_flight: AtomicBool,
}

impl SessionShared {
    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn phase(&self) -> Phase {
        *self.lock()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        *self.lock() = phase;
    }

    pub(crate) fn capture_in_flight(&self) -> bool {
        self.capture_in_flight.load(Ordering::Acquire)
    }

    /// Moves Previewing to AwaitingFocus unless a capture is already
    /// pending or still being persisted.
    pub(crate) fn try_arm(&self) -> Arm {
        let mut phase = self.lock();
        let current = *phase;
        match current {
            Phase::Idle => Arm::NotPreviewing(Phase::Idle),
            Phase::AwaitingFocus | Phase::Capturing => Arm::AlreadyPending,
            Phase::Previewing if self.capture_in_flight() => Arm::AlreadyPending,
            Phase::Previewing => {
                *phase = Phase::AwaitingFocus;
                Arm::Armed
            }
        }
    }

    /// Claims the in-flight slot for a still capture. Returns false if the
    /// session is no longer waiting on focus or the slot is taken.
    pub(crate) fn begin_capture(&self) -> bool {
        let mut phase = self.lock();
        if *phase != Phase::AwaitingFocus {
            return false;
        }
        let claimed = self
            .capture_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            *phase = Phase::Capturing;
        }
        claimed
    }

    /// Frame arrived: back to Previewing. The in-flight slot stays taken
    /// until the persist pipeline finishes.
    pub(crate) fn frame_delivered(&self) {
        let mut phase = self.lock();
        if *phase == Phase::Capturing {
            *phase = Phase::Previewing;
        }
    }

    /// Releases the in-flight slot.
    pub(crate) fn finish_capture(&self) {
        self.capture_in_flight.store(false, Ordering::Release);
    }

    /// The still capture could not be issued.
    pub(crate) fn abort_capture(&self) {
        self.frame_delivered();
        self.finish_capture();
    }
}

/// One attached camera and its lifecycle state.
///
/// Created by [`attach`](super::SessionController::attach) and dropped by
/// [`detach`](super::SessionController::detach).
pub struct CaptureSession {
    pub(crate) device: Arc<dyn CameraDevice>,
    pub(crate) info: DeviceInfo,
    pub(crate) shared: Arc<SessionShared>,
}

impl CaptureSession {
    pub(crate) fn new(device: Arc<dyn CameraDevice>, info: DeviceInfo) -> Self {
        Self {
            device,
            info,
            shared: Arc::new(SessionShared::default()),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    /// Whether a still capture is issued and not yet persisted.
    pub fn capture_in_flight(&self) -> bool {
        self.shared.capture_in_flight()
    }

    /// The attached device.
    pub fn device_info(&self) -> DeviceInfo {
        self.info
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.info)
            .field("phase", &self.phase())
            .field("capture_in_flight", &self.capture_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn previewing() -> SessionShared {
        let shared = SessionShared::default();
        shared.set_phase(Phase::Previewing);
        shared
    }

    #[test]
    fn test_fresh_state() {
        let shared = SessionShared::default();
        assert_eq!(shared.phase(), Phase::Idle);
        assert!(!shared.capture_in_flight());
    }

    #[test]
    fn test_arm_requires_preview() {
        let shared = SessionShared::default();
        assert_eq!(shared.try_arm(), Arm::NotPreviewing(Phase::Idle));
    }

    #[test]
    fn test_second_arm_is_pending() {
        let shared = previewing();
        assert_eq!(shared.try_arm(), Arm::Armed);
        assert_eq!(shared.try_arm(), Arm::AlreadyPending);
    }

    #[test]
    fn test_only_first_begin_claims() {
        let shared = previewing();
        shared.try_arm();

        assert!(shared.begin_capture());
        assert!(!shared.begin_capture());
        assert_eq!(shared.phase(), Phase::Capturing);
        assert!(shared.capture_in_flight());
    }

    #[test]
    fn test_in_flight_blocks_arm_until_finished() {
        let shared = previewing();
        shared.try_arm();
        shared.begin_capture();
        shared.frame_delivered();

        assert_eq!(shared.phase(), Phase::Previewing);
        assert_eq!(shared.try_arm(), Arm::AlreadyPending);

        shared.finish_capture();
        assert_eq!(shared.try_arm(), Arm::Armed);
    }

    #[test]
    fn test_begin_after_reset_is_refused() {
        let shared = previewing();
        shared.try_arm();
        shared.set_phase(Phase::Idle);
        assert!(!shared.begin_capture());
        assert!(!shared.capture_in_flight());
    }
}
