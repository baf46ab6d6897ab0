#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Calibration records assembled from a rig description.
pub mod assemble;

/// Rig configuration: image size, field of view and camera mounts.
pub mod config;

/// Output crop descriptor shared by all cameras.
pub mod crop;

/// Error types for configuration, geometry and file storage.
pub mod error;

/// Focal length and rotation matrix computations.
pub mod geometry;

/// Pinhole intrinsic matrix.
pub mod intrinsic;

/// Reading and writing calibration files in the OpenCV FileStorage YAML dialect.
pub mod io;

/// End-to-end generation of a calibration set into a directory.
pub mod pipeline;

pub use assemble::{assemble, CalibrationRecord};
pub use config::{CameraAddress, CameraMount, CameraSpec, OutputResolution, RigConfig};
pub use crop::OutputCropConfig;
pub use error::{CalibrationError, ConfigError, ErrorKind, FileStorageError, GeometryError};
pub use intrinsic::PinholeIntrinsic;
pub use pipeline::{generate, verify_generated, GenerationReport};
