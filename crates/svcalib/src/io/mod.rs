/// Calibration and crop files exchanged with the stitching engine.
pub mod calibration;

/// Minimal OpenCV FileStorage YAML reader and writer.
pub mod filestorage;

pub use calibration::*;
