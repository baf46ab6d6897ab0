use crate::error::{ConfigError, GeometryError};

/// Largest accepted deviation of `det(R)` from 1 and of `R^T R` from the identity.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-3;

/// The 3x3 identity matrix.
pub const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Compute the focal length in pixels from a horizontal field of view.
///
/// # Arguments
///
/// * `fov_deg` - The horizontal field of view in degrees.
/// * `width` - The image width in pixels.
///
/// # Returns
///
/// `width / (2 * tan(fov / 2))`.
///
/// PRECONDITION: 0 < fov_deg < 180.
///
/// Example:
///
/// ```
/// use svcalib::geometry::focal_length_from_fov;
///
/// let f = focal_length_from_fov(90.0, 1000).unwrap();
/// assert!((f - 500.0).abs() < 1e-9);
/// ```
pub fn focal_length_from_fov(fov_deg: f64, width: u32) -> Result<f64, ConfigError> {
    if !(fov_deg > 0.0 && fov_deg < 180.0) {
        return Err(ConfigError::InvalidFieldOfView(fov_deg));
    }
    let half_fov = fov_deg.to_radians() / 2.0;
    Ok(width as f64 / (2.0 * half_fov.tan()))
}

/// Elementary rotation about the vertical axis (pan).
pub fn rotation_z(angle_rad: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle_rad.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

/// Elementary rotation about the horizontal axis (tilt, positive is down).
pub fn rotation_x(angle_rad: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle_rad.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

/// Elementary rotation about the viewing axis (twist).
pub fn rotation_y(angle_rad: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle_rad.sin_cos();
    [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]
}

/// Compute the camera rotation matrix from Euler angles in degrees.
///
/// The rotation is composed as `R = Rz(yaw) * Ry(roll) * Rx(pitch)`. The order is
/// fixed: the downstream stitcher expects exactly this composition.
///
/// # Arguments
///
/// * `yaw_deg` - Pan about the vertical axis.
/// * `pitch_deg` - Tilt about the horizontal axis, positive is downward.
/// * `roll_deg` - Twist about the viewing axis.
///
/// # Returns
///
/// The rotation matrix, after checking that it is orthonormal with a
/// determinant of 1 within [`ORTHONORMAL_TOLERANCE`].
pub fn rotation_from_euler(
    yaw_deg: f64,
    pitch_deg: f64,
    roll_deg: f64,
) -> Result<[[f64; 3]; 3], GeometryError> {
    let rz = rotation_z(yaw_deg.to_radians());
    let ry = rotation_y(roll_deg.to_radians());
    let rx = rotation_x(pitch_deg.to_radians());

    let rotation = mat33_mul(&mat33_mul(&rz, &ry), &rx);
    check_rotation(&rotation)?;

    Ok(rotation)
}

/// Check that a matrix belongs to SO(3) within [`ORTHONORMAL_TOLERANCE`].
pub fn check_rotation(m: &[[f64; 3]; 3]) -> Result<(), GeometryError> {
    let det = determinant(m);
    let max_deviation = orthonormality_error(m);

    // NaN entries fail both comparisons
    let valid =
        (det - 1.0).abs() <= ORTHONORMAL_TOLERANCE && max_deviation <= ORTHONORMAL_TOLERANCE;
    if !valid {
        return Err(GeometryError::NotOrthonormal { det, max_deviation });
    }

    log::debug!("det(R) = {:.6}, max |RtR - I| = {:e}", det, max_deviation);

    Ok(())
}

/// Largest absolute entry of `m^T m - I`.
pub fn orthonormality_error(m: &[[f64; 3]; 3]) -> f64 {
    let mtm = mat33_mul(&transpose(m), m);
    let mut max_deviation = 0.0f64;
    for i in 0..3 {
        for j in 0..3 {
            let deviation = (mtm[i][j] - IDENTITY[i][j]).abs();
            // keep NaN so that it propagates into the check
            if deviation.is_nan() || deviation > max_deviation {
                max_deviation = deviation;
            }
        }
    }
    max_deviation
}

/// Multiply two 3x3 matrices.
pub fn mat33_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Transpose a 3x3 matrix.
pub fn transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = m[j][i];
        }
    }
    out
}

/// Determinant of a 3x3 matrix.
pub fn determinant(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_focal_length_reference_rig() -> Result<(), ConfigError> {
        // 1280 / (2 * tan(60 deg)) = 1280 / 3.4641016151377544
        let f = focal_length_from_fov(120.0, 1280)?;
        assert_relative_eq!(f, 369.5041722813605, epsilon = 1e-2);
        assert_relative_eq!(f, 1280.0 / (2.0 * 3.0f64.sqrt()), epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_focal_length_rejects_out_of_range() {
        for fov in [0.0, 180.0, -1.0, 270.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                focal_length_from_fov(fov, 1280),
                Err(ConfigError::InvalidFieldOfView(_))
            ));
        }
    }

    #[test]
    fn test_rotation_cardinal_yaws_are_orthonormal() -> Result<(), GeometryError> {
        for yaw in [0.0, 90.0, 180.0, 270.0] {
            let r = rotation_from_euler(yaw, 20.0, 0.0)?;
            assert_relative_eq!(determinant(&r), 1.0, epsilon = 1e-6);
            let rtr = mat33_mul(&transpose(&r), &r);
            for i in 0..3 {
                for j in 0..3 {
                    assert_relative_eq!(rtr[i][j], IDENTITY[i][j], epsilon = 1e-6);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_rotation_identity() -> Result<(), GeometryError> {
        let r = rotation_from_euler(0.0, 0.0, 0.0)?;
        assert_eq!(r, IDENTITY);
        Ok(())
    }

    #[test]
    fn test_rotation_pure_yaw() -> Result<(), GeometryError> {
        let r = rotation_from_euler(90.0, 0.0, 0.0)?;
        let expected = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(r[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_rotation_composition_order() -> Result<(), GeometryError> {
        let (yaw, pitch, roll) = (30.0f64, 20.0f64, 10.0f64);
        let r = rotation_from_euler(yaw, pitch, roll)?;

        let expected = mat33_mul(
            &mat33_mul(&rotation_z(yaw.to_radians()), &rotation_y(roll.to_radians())),
            &rotation_x(pitch.to_radians()),
        );
        assert_eq!(r, expected);

        // any other order gives a different rotation
        let swapped = mat33_mul(
            &mat33_mul(&rotation_z(yaw.to_radians()), &rotation_x(pitch.to_radians())),
            &rotation_y(roll.to_radians()),
        );
        let diff = (0..3)
            .flat_map(|i| (0..3).map(move |j| (i, j)))
            .map(|(i, j)| (r[i][j] - swapped[i][j]).abs())
            .fold(0.0, f64::max);
        assert!(diff > 1e-3);
        Ok(())
    }

    #[test]
    fn test_check_rotation_rejects_scaled_matrix() {
        let scaled = [[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(matches!(
            check_rotation(&scaled),
            Err(GeometryError::NotOrthonormal { .. })
        ));

        let reflection = [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(check_rotation(&reflection).is_err());
    }

    #[test]
    fn test_non_finite_angle_fails_self_test() {
        assert!(rotation_from_euler(f64::NAN, 0.0, 0.0).is_err());
    }
}
