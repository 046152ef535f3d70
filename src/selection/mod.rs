//! Capture size and format selection.
//!
//! Chooses which of the hardware's supported configurations to request.
//! Framing is preferred over raw size, but a usable size always exists
//! as long as the hardware reports at least one.

mod size;

pub use size::{apply_preferred_format, apply_preferred_size, select_optimal};
