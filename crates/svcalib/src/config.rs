use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Network address of a camera. Stored as metadata, never dialed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraAddress {
    /// Host name or IP address.
    pub host: String,
    /// TCP/UDP port.
    pub port: u16,
}

/// A camera mount as written in the rig configuration.
///
/// The pitch defaults to the rig-wide `pitchDownDeg` and the roll to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraMount {
    /// Position of the camera in the rig, contiguous from 0.
    pub index: usize,
    /// Short label, e.g. `Front`.
    pub name: String,
    /// Horizontal pan in degrees (0 = front, 90 = left, 180 = rear, 270 = right).
    pub yaw_deg: f64,
    /// Per-camera tilt override in degrees, positive is downward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_deg: Option<f64>,
    /// Twist about the viewing axis in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_deg: Option<f64>,
    /// Camera IP address.
    pub ip: String,
    /// Camera port.
    pub port: u16,
}

/// A fully resolved camera: all three angles and the address are known.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSpec {
    /// Position of the camera in the rig.
    pub index: usize,
    /// Short label.
    pub name: String,
    /// Yaw in degrees.
    pub yaw_deg: f64,
    /// Pitch in degrees, positive is downward.
    pub pitch_deg: f64,
    /// Roll in degrees.
    pub roll_deg: f64,
    /// Network address.
    pub address: CameraAddress,
}

/// Size of the destination canvas described by the crop file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputResolution {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
}

impl Default for OutputResolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Static description of a surround-view rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigConfig {
    /// Image width in pixels, shared by all cameras.
    pub image_width: u32,
    /// Image height in pixels, shared by all cameras.
    pub image_height: u32,
    /// Horizontal field of view in degrees.
    pub horizontal_fov_deg: f64,
    /// Downward tilt applied to every camera without a `pitchDeg` override.
    pub pitch_down_deg: f64,
    /// Camera mounts.
    pub cameras: Vec<CameraMount>,
    /// Destination canvas for the crop descriptor.
    #[serde(default)]
    pub output: OutputResolution,
}

impl RigConfig {
    /// The reference 4-camera rig: 1280x800 sensors, 120 degrees horizontal field
    /// of view, tilted 20 degrees down, one camera every 90 degrees of yaw.
    pub fn default_surround_rig() -> Self {
        let mount = |index: usize, name: &str, yaw_deg: f64| CameraMount {
            index,
            name: name.to_string(),
            yaw_deg,
            pitch_deg: None,
            roll_deg: None,
            ip: format!("192.168.45.{}", 10 + index),
            port: 5020 + index as u16,
        };

        Self {
            image_width: 1280,
            image_height: 800,
            horizontal_fov_deg: 120.0,
            pitch_down_deg: 20.0,
            cameras: vec![
                mount(0, "Front", 0.0),
                mount(1, "Left", 90.0),
                mount(2, "Rear", 180.0),
                mount(3, "Right", 270.0),
            ],
            output: OutputResolution::default(),
        }
    }

    /// Parse a rig configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a rig configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check the whole configuration and resolve the camera mounts.
    ///
    /// The returned specs keep the order of `cameras`.
    pub fn validate(&self) -> Result<Vec<CameraSpec>, ConfigError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigError::InvalidImageSize {
                width: self.image_width,
                height: self.image_height,
            });
        }

        // NaN fails both comparisons
        if !(self.horizontal_fov_deg > 0.0 && self.horizontal_fov_deg < 180.0) {
            return Err(ConfigError::InvalidFieldOfView(self.horizontal_fov_deg));
        }

        // the consumer reads the canvas corners as int
        let max_side = i32::MAX as u32;
        if self.output.width == 0
            || self.output.height == 0
            || self.output.width > max_side
            || self.output.height > max_side
        {
            return Err(ConfigError::InvalidOutputResolution {
                width: self.output.width,
                height: self.output.height,
            });
        }

        if self.cameras.is_empty() {
            return Err(ConfigError::EmptyRig);
        }

        let mut seen = HashSet::with_capacity(self.cameras.len());
        for camera in &self.cameras {
            if !seen.insert(camera.index) {
                return Err(ConfigError::DuplicateCameraIndex(camera.index));
            }
        }
        if let Some(missing) = (0..self.cameras.len()).find(|i| !seen.contains(i)) {
            return Err(ConfigError::NonContiguousCameraIndex { missing });
        }

        self.cameras
            .iter()
            .map(|mount| self.resolve(mount))
            .collect()
    }

    fn resolve(&self, mount: &CameraMount) -> Result<CameraSpec, ConfigError> {
        let spec = CameraSpec {
            index: mount.index,
            name: mount.name.clone(),
            yaw_deg: mount.yaw_deg,
            pitch_deg: mount.pitch_deg.unwrap_or(self.pitch_down_deg),
            roll_deg: mount.roll_deg.unwrap_or(0.0),
            address: CameraAddress {
                host: mount.ip.clone(),
                port: mount.port,
            },
        };

        for (angle, value) in [
            ("yaw", spec.yaw_deg),
            ("pitch", spec.pitch_deg),
            ("roll", spec.roll_deg),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteAngle {
                    index: spec.index,
                    angle,
                });
            }
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rig_is_valid() -> Result<(), ConfigError> {
        let rig = RigConfig::default_surround_rig();
        let specs = rig.validate()?;
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[2].name, "Rear");
        assert_eq!(specs[2].yaw_deg, 180.0);
        assert_eq!(specs[2].pitch_deg, 20.0);
        assert_eq!(specs[2].roll_deg, 0.0);
        assert_eq!(specs[3].address.host, "192.168.45.13");
        assert_eq!(specs[3].address.port, 5023);
        Ok(())
    }

    #[test]
    fn test_parse_camel_case_json() -> Result<(), ConfigError> {
        let json = r#"{
            "imageWidth": 640,
            "imageHeight": 480,
            "horizontalFovDeg": 90.0,
            "pitchDownDeg": 15.0,
            "cameras": [
                { "index": 1, "name": "Back", "yawDeg": 180.0, "ip": "10.0.0.2", "port": 6001 },
                { "index": 0, "name": "Fwd", "yawDeg": 0.0, "pitchDeg": 5.0, "rollDeg": 1.5,
                  "ip": "10.0.0.1", "port": 6000 }
            ]
        }"#;
        let rig = RigConfig::from_json_str(json)?;
        assert_eq!(rig.output, OutputResolution::default());

        let specs = rig.validate()?;
        // order of the configuration is kept
        assert_eq!(specs[0].index, 1);
        assert_eq!(specs[0].pitch_deg, 15.0);
        assert_eq!(specs[1].pitch_deg, 5.0);
        assert_eq!(specs[1].roll_deg, 1.5);
        Ok(())
    }

    #[test]
    fn test_missing_field_is_config_error() {
        let json = r#"{ "imageWidth": 640, "imageHeight": 480, "pitchDownDeg": 0.0, "cameras": [] }"#;
        let res = RigConfig::from_json_str(json);
        assert!(matches!(res, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_reject_fov_bounds() {
        for fov in [0.0, 180.0, -10.0, 200.0, f64::NAN] {
            let mut rig = RigConfig::default_surround_rig();
            rig.horizontal_fov_deg = fov;
            assert!(matches!(
                rig.validate(),
                Err(ConfigError::InvalidFieldOfView(_))
            ));
        }
    }

    #[test]
    fn test_reject_duplicate_index() {
        let mut rig = RigConfig::default_surround_rig();
        rig.cameras[3].index = 1;
        assert!(matches!(
            rig.validate(),
            Err(ConfigError::DuplicateCameraIndex(1))
        ));
    }

    #[test]
    fn test_reject_index_gap() {
        let mut rig = RigConfig::default_surround_rig();
        rig.cameras[3].index = 7;
        assert!(matches!(
            rig.validate(),
            Err(ConfigError::NonContiguousCameraIndex { missing: 3 })
        ));
    }

    #[test]
    fn test_reject_empty_and_degenerate() {
        let mut rig = RigConfig::default_surround_rig();
        rig.cameras.clear();
        assert!(matches!(rig.validate(), Err(ConfigError::EmptyRig)));

        let mut rig = RigConfig::default_surround_rig();
        rig.image_height = 0;
        assert!(matches!(
            rig.validate(),
            Err(ConfigError::InvalidImageSize { .. })
        ));

        let mut rig = RigConfig::default_surround_rig();
        rig.cameras[0].roll_deg = Some(f64::INFINITY);
        assert!(matches!(
            rig.validate(),
            Err(ConfigError::NonFiniteAngle {
                index: 0,
                angle: "roll"
            })
        ));
    }

    #[test]
    fn test_reject_output_beyond_int_range() {
        let mut rig = RigConfig::default_surround_rig();
        rig.output.width = 3_000_000_000;
        assert!(matches!(
            rig.validate(),
            Err(ConfigError::InvalidOutputResolution {
                width: 3_000_000_000,
                height: 1080
            })
        ));

        let mut rig = RigConfig::default_surround_rig();
        rig.output.height = i32::MAX as u32 + 1;
        assert!(matches!(
            rig.validate(),
            Err(ConfigError::InvalidOutputResolution { .. })
        ));

        let mut rig = RigConfig::default_surround_rig();
        rig.output.width = i32::MAX as u32;
        assert!(rig.validate().is_ok());
    }
}
