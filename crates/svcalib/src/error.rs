use std::path::PathBuf;

/// An error in the rig configuration. Always fatal for the whole run.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The horizontal field of view is outside the open interval (0, 180) degrees.
    #[error("Horizontal field of view must be in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),

    /// The image width or height is zero.
    #[error("Invalid image size {width}x{height}")]
    InvalidImageSize {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// The output crop canvas has a zero dimension or does not fit an `i32`.
    #[error("Invalid output resolution {width}x{height}")]
    InvalidOutputResolution {
        /// Canvas width in pixels.
        width: u32,
        /// Canvas height in pixels.
        height: u32,
    },

    /// The rig declares no cameras.
    #[error("The rig has no cameras")]
    EmptyRig,

    /// Two cameras share the same index.
    #[error("Duplicate camera index {0}")]
    DuplicateCameraIndex(usize),

    /// The camera indices do not cover `0..n` without gaps.
    #[error("Camera indices must be contiguous from 0, index {missing} is missing")]
    NonContiguousCameraIndex {
        /// The first index absent from the rig.
        missing: usize,
    },

    /// A camera angle is NaN or infinite.
    #[error("Camera {index} has a non-finite {angle} angle")]
    NonFiniteAngle {
        /// Index of the offending camera.
        index: usize,
        /// Which angle, `yaw`, `pitch` or `roll`.
        angle: &'static str,
    },

    /// The configuration file could not be read.
    #[error("Failed to read the configuration file {path}. {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or lacks a required field.
    #[error("Failed to parse the rig configuration. {0}")]
    Parse(#[from] serde_json::Error),
}

/// A computed rotation matrix violates the rotation group invariants.
#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    /// The matrix is not orthonormal or its determinant is not 1.
    #[error("Rotation matrix is not orthonormal: det = {det}, max |RtR - I| = {max_deviation}")]
    NotOrthonormal {
        /// Determinant of the matrix.
        det: f64,
        /// Largest absolute entry of `R^T R - I`.
        max_deviation: f64,
    },
}

/// An error reading or writing a FileStorage YAML file.
#[derive(thiserror::Error, Debug)]
pub enum FileStorageError {
    /// The file could not be created, written, flushed or read.
    #[error("Failed to access {path}. {source}")]
    Io {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file content is not valid FileStorage YAML.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A required key is absent.
    #[error("Key {key} not found in {path}")]
    MissingKey {
        /// Path of the offending file.
        path: PathBuf,
        /// The missing key.
        key: String,
    },

    /// A key holds a node of the wrong type or shape.
    #[error("Key {key} in {path} is not {expected}")]
    TypeMismatch {
        /// Path of the offending file.
        path: PathBuf,
        /// The offending key.
        key: String,
        /// Description of the expected node.
        expected: String,
    },

    /// A re-read file does not match the values that were written.
    #[error("Content of {path} differs from the generated values at {key}")]
    Mismatch {
        /// Path of the offending file.
        path: PathBuf,
        /// The first key that differs.
        key: String,
    },
}

/// The coarse classification of a [`CalibrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid rig configuration.
    Configuration,
    /// A rotation matrix failed its self-test.
    GeometryInvariant,
    /// Reading or writing a file failed.
    Io,
}

/// Top level error of a generation run.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    /// Invalid rig configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The rotation of a camera failed the orthonormality check.
    #[error("Camera {index} ({name}): {source}")]
    Geometry {
        /// Index of the camera being assembled.
        index: usize,
        /// Name of the camera being assembled.
        name: String,
        /// The geometry failure.
        source: GeometryError,
    },

    /// Writing or verifying an output file failed.
    #[error("{}{source}", .index.map(|i| format!("Camera {i}: ")).unwrap_or_default())]
    Storage {
        /// Index of the camera being written, `None` for the shared crop file.
        index: Option<usize>,
        /// The storage failure.
        source: FileStorageError,
    },
}

impl CalibrationError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibrationError::Config(_) => ErrorKind::Configuration,
            CalibrationError::Geometry { .. } => ErrorKind::GeometryInvariant,
            CalibrationError::Storage { .. } => ErrorKind::Io,
        }
    }
}
