//! Capture session lifecycle.
//!
//! The [`SessionController`] owns the attached camera and walks it through
//! `Idle → Previewing → AwaitingFocus → Capturing → Previewing`. Hardware
//! callbacks, the fallback timer and the persist worker may all run on
//! other threads; they share only the session phase and the in-flight flag.

mod controller;
mod pipeline;
mod scheduler;
mod state;

pub use controller::{AppliedConfiguration, CaptureStart, SessionController, SessionError};
pub use pipeline::{CapturePipeline, PersistError};
pub use scheduler::{ManualScheduler, Scheduler, Task, ThreadScheduler};
pub use state::{CaptureSession, Phase};
