//! Durable storage of captured artifacts.

mod clock;
mod sink;

pub use clock::{Clock, FixedClock, SystemClock};
pub use sink::{CaptureSink, DirectoryMedium, StorageError, StorageMedium};
