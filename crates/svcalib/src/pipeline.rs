use std::path::{Path, PathBuf};

use crate::{
    assemble::{assemble, CalibrationRecord},
    config::RigConfig,
    crop::OutputCropConfig,
    error::{CalibrationError, FileStorageError},
    io::{
        calibration_file_name, read_calibration, read_output_crop, write_calibration,
        write_output_crop, OUTPUT_CROP_FILE_NAME,
    },
};

/// Values re-read from disk must match the generated ones within this tolerance.
const VERIFY_TOLERANCE: f64 = 1e-5;

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// The calibration records, in configuration order.
    pub records: Vec<CalibrationRecord>,
    /// The crop descriptor that was written.
    pub crop: OutputCropConfig,
    /// Every written file: one per camera, then the crop file.
    pub written: Vec<PathBuf>,
}

/// Generate the calibration set of a rig into `out_dir`.
///
/// All records are assembled and checked before the first file is written, so a
/// configuration or geometry error leaves the directory untouched. An I/O error
/// stops the run at the failing file; files written before it are kept.
///
/// # Arguments
///
/// * `rig` - The rig description.
/// * `out_dir` - The output directory, created if missing.
///
/// # Returns
///
/// The generated records and the written paths.
pub fn generate(
    rig: &RigConfig,
    out_dir: impl AsRef<Path>,
) -> Result<GenerationReport, CalibrationError> {
    let out_dir = out_dir.as_ref();

    let records = assemble(rig)?;
    let crop = OutputCropConfig::try_from(rig.output)?;

    std::fs::create_dir_all(out_dir).map_err(|source| CalibrationError::Storage {
        index: None,
        source: FileStorageError::Io {
            path: out_dir.to_path_buf(),
            source,
        },
    })?;

    let mut written = Vec::with_capacity(records.len() + 1);
    for record in &records {
        let path =
            write_calibration(out_dir, record).map_err(|source| CalibrationError::Storage {
                index: Some(record.camera.index),
                source,
            })?;
        written.push(path);
    }

    let crop_path =
        write_output_crop(out_dir, &crop).map_err(|source| CalibrationError::Storage {
            index: None,
            source,
        })?;
    written.push(crop_path);

    log::info!(
        "Generated {} calibration files and {} in {}",
        records.len(),
        OUTPUT_CROP_FILE_NAME,
        out_dir.display()
    );

    Ok(GenerationReport {
        records,
        crop,
        written,
    })
}

fn close(a: f64, b: f64) -> bool {
    // matrices are stored in single precision, compare relative to magnitude
    (a - b).abs() <= VERIFY_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

fn close33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> bool {
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| close(*x, *y))
}

/// Re-read the files of a generated calibration set and compare them with the
/// values they were generated from.
pub fn verify_generated(
    out_dir: impl AsRef<Path>,
    records: &[CalibrationRecord],
    crop: &OutputCropConfig,
) -> Result<(), CalibrationError> {
    let out_dir = out_dir.as_ref();

    for record in records {
        let index = record.camera.index;
        let path = out_dir.join(calibration_file_name(index));
        let storage_err = |source| CalibrationError::Storage {
            index: Some(index),
            source,
        };

        let stored = read_calibration(&path).map_err(storage_err)?;

        let mismatch = if !close(stored.focal_length, record.focal_length) {
            Some("FocalLength")
        } else if !close33(&stored.intrinsic, &record.intrinsic.camera_matrix()) {
            Some("Intrisic")
        } else if !close33(&stored.rotation, &record.rotation) {
            Some("Rotation")
        } else if stored.translation != record.translation {
            Some("Translation")
        } else if stored.name != record.camera.name {
            Some("CameraName")
        } else if stored.address.host != record.camera.address.host {
            Some("CameraIP")
        } else if stored.address.port != record.camera.address.port {
            Some("CameraPort")
        } else {
            None
        };

        if let Some(key) = mismatch {
            return Err(storage_err(FileStorageError::Mismatch {
                path,
                key: key.to_string(),
            }));
        }
        log::debug!("Verified {}", path.display());
    }

    let crop_path = out_dir.join(OUTPUT_CROP_FILE_NAME);
    let stored = read_output_crop(&crop_path).map_err(|source| CalibrationError::Storage {
        index: None,
        source,
    })?;
    let mismatch = if stored.resolution != crop.resolution {
        Some("res_size")
    } else {
        stored
            .corners()
            .iter()
            .zip(crop.corners())
            .find(|((_, a), (_, b))| a != b)
            .map(|((name, _), _)| *name)
    };
    if let Some(key) = mismatch {
        return Err(CalibrationError::Storage {
            index: None,
            source: FileStorageError::Mismatch {
                path: crop_path,
                key: key.to_string(),
            },
        });
    }

    log::info!(
        "Verified {} calibration files in {}",
        records.len(),
        out_dir.display()
    );

    Ok(())
}
