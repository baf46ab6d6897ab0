/// Intrinsic parameters of an ideal pinhole camera: square pixels, no skew, no distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsic {
    /// The focal length in pixels, shared by both axes
    pub focal_length: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl PinholeIntrinsic {
    /// Build the intrinsics of a camera whose principal point is the image center.
    ///
    /// # Arguments
    ///
    /// * `focal_length` - The focal length in pixels.
    /// * `width` - The image width in pixels.
    /// * `height` - The image height in pixels.
    pub fn centered(focal_length: f64, width: u32, height: u32) -> Self {
        Self {
            focal_length,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        }
    }

    /// Returns the camera matrix `K` in row-major order.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.focal_length, 0.0, self.cx],
            [0.0, self.focal_length, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }
}
