use crate::{
    config::{CameraSpec, RigConfig},
    error::CalibrationError,
    geometry::{determinant, focal_length_from_fov, rotation_from_euler},
    intrinsic::PinholeIntrinsic,
};

/// Calibration of a single camera of the rig.
///
/// All cameras share the rig origin, so the translation is always zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRecord {
    /// The camera this record belongs to.
    pub camera: CameraSpec,
    /// Rotation matrix, row-major.
    pub rotation: [[f64; 3]; 3],
    /// Pinhole intrinsics.
    pub intrinsic: PinholeIntrinsic,
    /// Translation vector.
    pub translation: [f64; 3],
    /// Focal length in pixels.
    pub focal_length: f64,
}

impl CalibrationRecord {
    /// The optical axis of the camera in the rig frame (third column of the rotation).
    pub fn viewing_direction(&self) -> [f64; 3] {
        [
            self.rotation[0][2],
            self.rotation[1][2],
            self.rotation[2][2],
        ]
    }
}

/// Assemble one calibration record per camera of the rig.
///
/// The configuration is fully validated before any camera is processed and the
/// records keep the order of `rig.cameras`. A camera whose rotation fails the
/// orthonormality check aborts the whole assembly.
///
/// # Arguments
///
/// * `rig` - The rig description.
///
/// # Returns
///
/// The calibration records.
pub fn assemble(rig: &RigConfig) -> Result<Vec<CalibrationRecord>, CalibrationError> {
    let cameras = rig.validate()?;

    let focal_length = focal_length_from_fov(rig.horizontal_fov_deg, rig.image_width)?;
    let intrinsic = PinholeIntrinsic::centered(focal_length, rig.image_width, rig.image_height);

    log::info!(
        "Rig: {}x{}, horizontal fov {} deg, pitch {} deg down",
        rig.image_width,
        rig.image_height,
        rig.horizontal_fov_deg,
        rig.pitch_down_deg
    );
    log::info!(
        "Focal length {:.2} px, principal point ({:.1}, {:.1})",
        focal_length,
        intrinsic.cx,
        intrinsic.cy
    );

    cameras
        .into_iter()
        .map(|camera| assemble_camera(camera, focal_length, intrinsic))
        .collect()
}

fn assemble_camera(
    camera: CameraSpec,
    focal_length: f64,
    intrinsic: PinholeIntrinsic,
) -> Result<CalibrationRecord, CalibrationError> {
    let rotation = rotation_from_euler(camera.yaw_deg, camera.pitch_deg, camera.roll_deg)
        .map_err(|source| CalibrationError::Geometry {
            index: camera.index,
            name: camera.name.clone(),
            source,
        })?;

    let record = CalibrationRecord {
        camera,
        rotation,
        intrinsic,
        translation: [0.0; 3],
        focal_length,
    };

    let [dx, dy, dz] = record.viewing_direction();
    log::info!(
        "Camera {} ({}) at {}:{}: yaw {} deg, pitch {} deg, roll {} deg, viewing direction [{:.3}, {:.3}, {:.3}], det(R) = {:.6}",
        record.camera.index,
        record.camera.name,
        record.camera.address.host,
        record.camera.address.port,
        record.camera.yaw_deg,
        record.camera.pitch_deg,
        record.camera.roll_deg,
        dx,
        dy,
        dz,
        determinant(&record.rotation)
    );

    Ok(record)
}
