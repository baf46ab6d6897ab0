use approx::assert_relative_eq;
use svcalib::{
    assemble, generate,
    geometry::{mat33_mul, rotation_z, transpose},
    io::{read_calibration_set, read_output_crop, OUTPUT_CROP_FILE_NAME},
    CalibrationError, ErrorKind, OutputCropConfig, RigConfig,
};

const REFERENCE_RIG: &str = r#"{
    "imageWidth": 1280,
    "imageHeight": 800,
    "horizontalFovDeg": 120,
    "pitchDownDeg": 20,
    "cameras": [
        { "index": 0, "name": "Front", "yawDeg": 0,   "ip": "192.168.45.10", "port": 5020 },
        { "index": 1, "name": "Left",  "yawDeg": 90,  "ip": "192.168.45.11", "port": 5021 },
        { "index": 2, "name": "Rear",  "yawDeg": 180, "ip": "192.168.45.12", "port": 5022 },
        { "index": 3, "name": "Right", "yawDeg": 270, "ip": "192.168.45.13", "port": 5023 }
    ]
}"#;

const FOCAL_LENGTH_120_1280: f64 = 369.5041722813605;

#[test]
fn reference_rig_records() -> Result<(), Box<dyn std::error::Error>> {
    let rig = RigConfig::from_json_str(REFERENCE_RIG)?;
    assert_eq!(rig, RigConfig::default_surround_rig());

    let records = assemble(&rig)?;
    assert_eq!(records.len(), 4);

    let expected_k = [
        [FOCAL_LENGTH_120_1280, 0.0, 640.0],
        [0.0, FOCAL_LENGTH_120_1280, 400.0],
        [0.0, 0.0, 1.0],
    ];
    for record in &records {
        assert_relative_eq!(record.focal_length, FOCAL_LENGTH_120_1280, epsilon = 1e-2);
        let k = record.intrinsic.camera_matrix();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(k[i][j], expected_k[i][j], epsilon = 1e-6);
            }
        }
    }

    // undoing the yaw of each camera gives back the front camera rotation
    let front = records[0].rotation;
    for record in &records[1..] {
        assert_ne!(record.rotation, front);
        let unyawed = mat33_mul(
            &transpose(&rotation_z(record.camera.yaw_deg.to_radians())),
            &record.rotation,
        );
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(unyawed[i][j], front[i][j], epsilon = 1e-12);
            }
        }
    }

    Ok(())
}

#[test]
fn generated_files_read_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let report = generate(&RigConfig::default_surround_rig(), dir.path())?;

    let stored = read_calibration_set(dir.path(), report.records.len())?;
    for (record, stored) in report.records.iter().zip(&stored) {
        let k = record.intrinsic.camera_matrix();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    stored.intrinsic[i][j],
                    k[i][j],
                    epsilon = 1e-5,
                    max_relative = 1e-5
                );
                assert_relative_eq!(stored.rotation[i][j], record.rotation[i][j], epsilon = 1e-5);
            }
        }
        assert_relative_eq!(stored.focal_length, record.focal_length, epsilon = 1e-9);
        assert_eq!(stored.name, record.camera.name);
        assert_eq!(stored.address, record.camera.address);
    }

    let crop = read_output_crop(dir.path().join(OUTPUT_CROP_FILE_NAME))?;
    assert_eq!(crop, OutputCropConfig::full_canvas(1920, 1080));

    Ok(())
}

#[test]
fn generation_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let rig = RigConfig::default_surround_rig();
    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;

    let a = generate(&rig, first.path())?;
    let b = generate(&rig, second.path())?;
    assert_eq!(a.written.len(), b.written.len());

    for (pa, pb) in a.written.iter().zip(&b.written) {
        assert_eq!(pa.file_name(), pb.file_name());
        assert_eq!(std::fs::read(pa)?, std::fs::read(pb)?);
    }

    // running again over the same directory overwrites with the same bytes
    let before = std::fs::read(&a.written[0])?;
    generate(&rig, first.path())?;
    assert_eq!(std::fs::read(&a.written[0])?, before);

    Ok(())
}

#[test]
fn field_of_view_bounds_are_configuration_errors() -> Result<(), Box<dyn std::error::Error>> {
    for fov in [0.0, 180.0] {
        let dir = tempfile::tempdir()?;
        let mut rig = RigConfig::default_surround_rig();
        rig.horizontal_fov_deg = fov;

        let err = generate(&rig, dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, CalibrationError::Config(_)));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    }
    Ok(())
}

#[test]
fn per_camera_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let json = r#"{
        "imageWidth": 1920,
        "imageHeight": 1080,
        "horizontalFovDeg": 90,
        "pitchDownDeg": 10,
        "output": { "width": 1280, "height": 720 },
        "cameras": [
            { "index": 0, "name": "Front", "yawDeg": 0, "pitchDeg": 0, "rollDeg": 0, "ip": "10.0.0.1", "port": 7000 }
        ]
    }"#;
    let rig = RigConfig::from_json_str(json)?;
    let dir = tempfile::tempdir()?;
    let report = generate(&rig, dir.path())?;

    assert_relative_eq!(report.records[0].focal_length, 960.0, epsilon = 1e-9);
    assert_eq!(report.records[0].viewing_direction(), [0.0, 0.0, 1.0]);
    assert_eq!(report.crop, OutputCropConfig::full_canvas(1280, 720));
    Ok(())
}
