//! Post-capture orientation correction.

mod corrector;

pub use corrector::{OrientationCorrector, OrientationError, OrientedImage, Rotation};
