use std::path::{Path, PathBuf};

use super::filestorage::{ElemType, FileStorage, FileStorageWriter};
use crate::{
    assemble::CalibrationRecord, config::CameraAddress, crop::OutputCropConfig,
    error::FileStorageError,
};

// Key names read by the stitching engine. `Intrisic` is spelled the way the
// consumer reads it.
const KEY_FOCAL_LENGTH: &str = "FocalLength";
const KEY_INTRINSIC: &str = "Intrisic";
const KEY_ROTATION: &str = "Rotation";
const KEY_TRANSLATION: &str = "Translation";
const KEY_CAMERA_NAME: &str = "CameraName";
const KEY_CAMERA_IP: &str = "CameraIP";
const KEY_CAMERA_PORT: &str = "CameraPort";

const KEY_RESOLUTION: &str = "res_size";

/// File name of the shared output crop descriptor.
pub const OUTPUT_CROP_FILE_NAME: &str = "corner_warppts.yaml";

/// File name of the calibration of camera `index`.
pub fn calibration_file_name(index: usize) -> String {
    format!("Camparam{index}.yaml")
}

/// Calibration of one camera as read back from its file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCalibration {
    /// Focal length in pixels.
    pub focal_length: f64,
    /// Intrinsic matrix, row-major.
    pub intrinsic: [[f64; 3]; 3],
    /// Rotation matrix, row-major.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
    /// Camera name.
    pub name: String,
    /// Camera network address.
    pub address: CameraAddress,
}

fn flatten33(m: &[[f64; 3]; 3]) -> [f64; 9] {
    [
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    ]
}

fn unflatten33(data: &[f64]) -> [[f64; 3]; 3] {
    let mut m = [[0.0; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        row.copy_from_slice(&data[i * 3..i * 3 + 3]);
    }
    m
}

/// Write the calibration file of one camera into `dir`.
///
/// The file is named after the camera index and overwritten if it exists. It is
/// flushed and closed before returning, also when a write fails.
///
/// # Arguments
///
/// * `dir` - The output directory.
/// * `record` - The calibration of the camera.
///
/// # Returns
///
/// The path of the written file.
pub fn write_calibration(
    dir: impl AsRef<Path>,
    record: &CalibrationRecord,
) -> Result<PathBuf, FileStorageError> {
    let path = dir
        .as_ref()
        .join(calibration_file_name(record.camera.index));

    let mut fs = FileStorageWriter::create(&path)?;
    fs.write_real(KEY_FOCAL_LENGTH, record.focal_length)?;
    fs.write_mat(
        KEY_INTRINSIC,
        3,
        3,
        ElemType::F32,
        &flatten33(&record.intrinsic.camera_matrix()),
    )?;
    fs.write_mat(KEY_ROTATION, 3, 3, ElemType::F32, &flatten33(&record.rotation))?;
    fs.write_mat(KEY_TRANSLATION, 3, 1, ElemType::F64, &record.translation)?;
    fs.write_str(KEY_CAMERA_NAME, &record.camera.name)?;
    fs.write_str(KEY_CAMERA_IP, &record.camera.address.host)?;
    fs.write_int(KEY_CAMERA_PORT, record.camera.address.port as i64)?;
    fs.release()?;

    log::info!("Saved {}", path.display());

    Ok(path)
}

/// Read a calibration file written by [`write_calibration`].
pub fn read_calibration(path: impl AsRef<Path>) -> Result<StoredCalibration, FileStorageError> {
    let fs = FileStorage::open(path)?;

    let intrinsic = unflatten33(&fs.mat(KEY_INTRINSIC, 3, 3)?.data);
    let rotation = unflatten33(&fs.mat(KEY_ROTATION, 3, 3)?.data);
    let translation = {
        let t = &fs.mat(KEY_TRANSLATION, 3, 1)?.data;
        [t[0], t[1], t[2]]
    };

    let port = fs.int(KEY_CAMERA_PORT)?;
    let port = u16::try_from(port).map_err(|_| FileStorageError::TypeMismatch {
        path: fs.path().to_path_buf(),
        key: KEY_CAMERA_PORT.to_string(),
        expected: "a port number".to_string(),
    })?;

    Ok(StoredCalibration {
        focal_length: fs.real(KEY_FOCAL_LENGTH)?,
        intrinsic,
        rotation,
        translation,
        name: fs.string(KEY_CAMERA_NAME)?.to_string(),
        address: CameraAddress {
            host: fs.string(KEY_CAMERA_IP)?.to_string(),
            port,
        },
    })
}

/// Read `Camparam0.yaml` .. `Camparam{n-1}.yaml` from `dir`, in index order.
pub fn read_calibration_set(
    dir: impl AsRef<Path>,
    num_cameras: usize,
) -> Result<Vec<StoredCalibration>, FileStorageError> {
    (0..num_cameras)
        .map(|i| read_calibration(dir.as_ref().join(calibration_file_name(i))))
        .collect()
}

/// Write the shared output crop descriptor into `dir`.
///
/// # Returns
///
/// The path of the written file.
pub fn write_output_crop(
    dir: impl AsRef<Path>,
    crop: &OutputCropConfig,
) -> Result<PathBuf, FileStorageError> {
    let path = dir.as_ref().join(OUTPUT_CROP_FILE_NAME);

    let as_f64 = |p: [i32; 2]| [p[0] as f64, p[1] as f64];

    let mut fs = FileStorageWriter::create(&path)?;
    fs.write_mat(KEY_RESOLUTION, 2, 1, ElemType::I32, &as_f64(crop.resolution))?;
    for (key, corner) in crop.corners() {
        fs.write_mat(key, 2, 1, ElemType::I32, &as_f64(corner))?;
    }
    fs.release()?;

    log::info!(
        "Saved {} ({}x{} output)",
        path.display(),
        crop.resolution[0],
        crop.resolution[1]
    );

    Ok(path)
}

/// Read an output crop descriptor written by [`write_output_crop`].
pub fn read_output_crop(path: impl AsRef<Path>) -> Result<OutputCropConfig, FileStorageError> {
    let fs = FileStorage::open(path)?;

    let point = |key: &str| -> Result<[i32; 2], FileStorageError> {
        let data = &fs.mat(key, 2, 1)?.data;
        let mut p = [0i32; 2];
        for (dst, src) in p.iter_mut().zip(data) {
            if src.fract() != 0.0 || *src < i32::MIN as f64 || *src > i32::MAX as f64 {
                return Err(FileStorageError::TypeMismatch {
                    path: fs.path().to_path_buf(),
                    key: key.to_string(),
                    expected: "an integer point".to_string(),
                });
            }
            *dst = *src as i32;
        }
        Ok(p)
    };

    Ok(OutputCropConfig {
        resolution: point(KEY_RESOLUTION)?,
        tl: point("tl")?,
        tr: point("tr")?,
        bl: point("bl")?,
        br: point("br")?,
    })
}
