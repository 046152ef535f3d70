//! Prometheus metrics for the capture pipeline.
//!
//! # Metrics Exposed
//!
//! - `still_capture_requests_total` - Capture calls that armed the race
//! - `still_capture_ignored_total` - Capture calls ignored while one was pending
//! - `still_capture_focus_triggers_total` - Captures released by focus completion
//! - `still_capture_fallback_triggers_total` - Captures released by the fallback timer
//! - `still_capture_focus_failures_total` - Rejected auto-focus requests
//! - `still_capture_artifacts_stored_total` - Artifacts written
//! - `still_capture_persist_failures_total` - Decode or storage failures
//! - `still_capture_in_flight` - 1 while a capture is in flight
//!
//! # Example
//!
//! ```
//! use still_capture::metrics::CaptureMetrics;
//!
//! let metrics = CaptureMetrics::new().expect("Failed to create registry");
//! metrics.record_request();
//! assert!(metrics.encode().unwrap().contains("still_capture_requests_total 1"));
//! ```

mod collector;

pub use collector::{CaptureMetrics, MetricsError, TriggerSource};
