use crate::{config::OutputResolution, error::ConfigError};

/// Output crop descriptor: the destination canvas size and the four corners of
/// the region kept from the stitched panorama.
///
/// Corner coordinates are in destination canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCropConfig {
    /// Canvas size as `[width, height]`.
    pub resolution: [i32; 2],
    /// Top-left corner.
    pub tl: [i32; 2],
    /// Top-right corner.
    pub tr: [i32; 2],
    /// Bottom-left corner.
    pub bl: [i32; 2],
    /// Bottom-right corner.
    pub br: [i32; 2],
}

impl OutputCropConfig {
    /// A crop that keeps the whole canvas.
    pub fn full_canvas(width: i32, height: i32) -> Self {
        Self {
            resolution: [width, height],
            tl: [0, 0],
            tr: [width, 0],
            bl: [0, height],
            br: [width, height],
        }
    }

    /// The named corners in file order.
    pub fn corners(&self) -> [(&'static str, [i32; 2]); 4] {
        [
            ("tl", self.tl),
            ("tr", self.tr),
            ("bl", self.bl),
            ("br", self.br),
        ]
    }
}

impl TryFrom<OutputResolution> for OutputCropConfig {
    type Error = ConfigError;

    fn try_from(output: OutputResolution) -> Result<Self, Self::Error> {
        let invalid = || ConfigError::InvalidOutputResolution {
            width: output.width,
            height: output.height,
        };
        let width = i32::try_from(output.width).map_err(|_| invalid())?;
        let height = i32::try_from(output.height).map_err(|_| invalid())?;
        Ok(Self::full_canvas(width, height))
    }
}

impl Default for OutputCropConfig {
    fn default() -> Self {
        Self::full_canvas(1920, 1080)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_full_hd_canvas() {
        let crop = OutputCropConfig::default();
        assert_eq!(crop.resolution, [1920, 1080]);
        assert_eq!(crop.tl, [0, 0]);
        assert_eq!(crop.tr, [1920, 0]);
        assert_eq!(crop.bl, [0, 1080]);
        assert_eq!(crop.br, [1920, 1080]);
    }

    #[test]
    fn test_corner_order() {
        let crop = OutputCropConfig::full_canvas(4, 3);
        let names = crop.corners().map(|(name, _)| name);
        assert_eq!(names, ["tl", "tr", "bl", "br"]);
        assert_eq!(crop.corners()[3].1, [4, 3]);
    }

    #[test]
    fn test_from_output_resolution() -> Result<(), ConfigError> {
        let crop = OutputCropConfig::try_from(OutputResolution::default())?;
        assert_eq!(crop, OutputCropConfig::default());

        let too_wide = OutputResolution {
            width: 3_000_000_000,
            height: 1080,
        };
        assert!(matches!(
            OutputCropConfig::try_from(too_wide),
            Err(ConfigError::InvalidOutputResolution { .. })
        ));
        Ok(())
    }
}
