//! End-to-end tests: measurement JSON -> engine -> CSV tables

use approx::assert_relative_eq;
use chromalign::{
    AlignmentConfig, AlignmentInput, CalibrationRecord, ChannelAlignmentEngine, ChannelSpot,
    DetectedSpot, ImageCalibration, ImageMeasurement, MicroscopeSettings, RegistrationError,
    ReportWriter,
};
use microscope_optics::{ImmersionMedium, OpticalSystem, OpticsError, SpaceUnit, VoxelSize};
use nalgebra::Point3;
use std::path::Path;
use test_helpers::{scratch_dir, test_output_path};

fn oil_63x_settings() -> MicroscopeSettings {
    MicroscopeSettings {
        objective_magnification: "63x".to_string(),
        objective_na: 1.4,
        objective_immersion: "Oil".to_string(),
        ..MicroscopeSettings::default()
    }
}

fn bead_measurement(image_name: &str, offsets: &[[f64; 3]]) -> ImageMeasurement {
    let spots = offsets
        .iter()
        .enumerate()
        .map(|(i, [dx, dy, dz])| DetectedSpot {
            channel: i as u32 + 1,
            x: 12.0 + dx,
            y: 8.0 + dy,
            z: 3.0 + dz,
            quality: 100.0 - i as f64,
        })
        .collect();

    ImageMeasurement {
        image_name: image_name.to_string(),
        filename: format!("{image_name}.czi"),
        nb_channels: offsets.len() as u32,
        calibration: CalibrationRecord {
            pixel_width: 0.1,
            pixel_height: 0.1,
            pixel_depth: 0.3,
            space_unit: "micron".to_string(),
            time_unit: "sec".to_string(),
        },
        metadata: None,
        spots,
    }
}

fn write_measurement(dir: &Path, measurement: &ImageMeasurement) -> std::path::PathBuf {
    let path = dir.join(format!("{}.json", measurement.image_name));
    measurement.save_to_file(&path).unwrap();
    path
}

fn input_with_optics(spots: Vec<ChannelSpot>, optics: OpticalSystem) -> AlignmentInput {
    AlignmentInput {
        image_name: "synthetic".to_string(),
        filename: "synthetic.tif".to_string(),
        spots,
        calibration: ImageCalibration::new(
            VoxelSize::new(0.1, 0.1, 0.3).unwrap(),
            SpaceUnit::Micrometer,
            "sec",
        ),
        optics,
    }
}

#[test]
fn test_measurement_files_to_csv_tables() {
    let _ = env_logger::builder().is_test(true).try_init();

    let input_dir = scratch_dir("pipeline_inputs");
    let paths = [
        write_measurement(
            &input_dir,
            &bead_measurement(
                "Beads_63x_Slide-1",
                &[[0.0, 0.0, 0.0], [0.04, -0.03, 0.12], [0.09, 0.05, 0.31]],
            ),
        ),
        write_measurement(
            &input_dir,
            &bead_measurement("Beads_63x_Slide-2_Pos-4", &[[0.0, 0.0, 0.0], [0.02, 0.01, -0.08]]),
        ),
    ];

    let settings = oil_63x_settings();
    let engine = ChannelAlignmentEngine::default();

    let alignments: Vec<_> = paths
        .iter()
        .map(|path| {
            let measurement = ImageMeasurement::load_from_file(path).unwrap();
            let input = measurement.to_alignment_input(&settings).unwrap();
            engine.align_image(&input).unwrap()
        })
        .collect();

    assert_eq!(alignments[0].rows.len(), 9);
    assert_eq!(alignments[1].rows.len(), 4);
    assert!(alignments.iter().all(|a| a.failures.is_empty()));

    let row = alignments[0].pair(1, 2).unwrap();
    assert_eq!(row.channel_name_1, "DAPI");
    assert_eq!(row.channel_name_2, "Alexa488");
    assert_eq!(row.refractive_index, 1.515);
    assert_relative_eq!(row.shift_pixels.z, 0.4, epsilon = 1e-9);
    assert!(row.reference.unwrap().projected);

    let writer = ReportWriter::new(test_output_path("channel_alignment"));
    let (full, essential) = writer.write_merged(&alignments).unwrap();

    let mut reader = csv::Reader::from_path(&full).unwrap();
    assert_eq!(reader.headers().unwrap().len(), 60);
    assert_eq!(reader.records().count(), 13);

    let mut reader = csv::Reader::from_path(&essential).unwrap();
    let header = reader.headers().unwrap().clone();
    assert_eq!(&header[1], "Filename-Variable-001");
    assert_eq!(&header[5], "Channel 1");
    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 13);
    assert_eq!(&records[0][0], "Beads_63x_Slide-1.czi");
    assert_eq!(&records[0][3], "Slide-1");
    assert_eq!(&records[0][4], "");
    assert_eq!(&records[9][4], "Pos-4");

    std::fs::remove_dir_all(&input_dir).ok();
}

#[test]
fn test_identical_positions_give_zero_ratios() {
    let spots = vec![
        ChannelSpot::new(1, "GFP", 510.0, Point3::new(2.0, 3.0, 4.0), 10.0).unwrap(),
        ChannelSpot::new(2, "mCherry", 610.0, Point3::new(2.0, 3.0, 4.0), 10.0).unwrap(),
    ];
    let optics = OpticalSystem::new(1.4, ImmersionMedium::Oil).unwrap();

    let result = ChannelAlignmentEngine::default()
        .align_image(&input_with_optics(spots, optics))
        .unwrap();

    for row in &result.rows {
        assert_eq!(row.colocalization_ratio_lateral, 0.0);
        assert_eq!(row.colocalization_ratio_axial, 0.0);
        assert_eq!(row.colocalization_ratio_3d, Some(0.0));
        assert_eq!(row.reference.unwrap().position, Point3::new(2.0, 3.0, 4.0));
    }
}

#[test]
fn test_heavily_misregistered_lateral_shift() {
    // 0.51 * 1.0 µm / 1.275 gives a 0.4 µm lateral resolution, well sampled
    // by 0.1 µm pixels, so the semi-minor axis is 0.2 µm
    let spots = vec![
        ChannelSpot::new(1, "NIR-1", 1000.0, Point3::new(0.0, 0.0, 0.0), 10.0).unwrap(),
        ChannelSpot::new(2, "NIR-2", 1000.0, Point3::new(5.0, 0.0, 0.0), 10.0).unwrap(),
    ];
    let optics = OpticalSystem::new(1.275, ImmersionMedium::Oil).unwrap();

    let result = ChannelAlignmentEngine::default()
        .align_image(&input_with_optics(spots, optics))
        .unwrap();
    let row = result.pair(1, 2).unwrap();

    assert_relative_eq!(row.semi_minor_axis, 0.2, epsilon = 1e-12);
    assert_relative_eq!(row.colocalization_ratio_lateral, 25.0, epsilon = 1e-9);
    assert_eq!(row.colocalization_ratio_axial, 0.0);
}

#[test]
fn test_invalid_geometry_fails_pairs_not_batch() {
    let spots = vec![
        ChannelSpot::new(1, "GFP", 510.0, Point3::new(0.0, 0.0, 0.0), 10.0).unwrap(),
        ChannelSpot::new(2, "mCherry", 610.0, Point3::new(0.1, 0.1, 0.2), 10.0).unwrap(),
    ];
    // Oil objective NA with an air immersion setting
    let bad = OpticalSystem::new(1.4, ImmersionMedium::Air).unwrap();
    let good = OpticalSystem::new(0.9, ImmersionMedium::from("Foo")).unwrap();

    let engine = ChannelAlignmentEngine::new(AlignmentConfig {
        include_self_pairs: false,
        ..AlignmentConfig::default()
    });
    let results = engine.align(&[
        input_with_optics(spots.clone(), bad),
        input_with_optics(spots, good),
    ]);

    let failed = results[0].as_ref().unwrap();
    assert!(failed.rows.is_empty());
    assert_eq!(failed.failures.len(), 2);
    assert!(failed.failures.iter().all(|f| matches!(
        f.error,
        RegistrationError::Optics(OpticsError::InvalidOpticalGeometry { .. })
    )));

    // Unknown medium falls back to n = 1.0
    let ok = results[1].as_ref().unwrap();
    assert_eq!(ok.rows.len(), 2);
    assert_eq!(ok.rows[0].refractive_index, 1.0);

    let mut buffer = Vec::new();
    chromalign::write_full_table(&mut buffer, &[failed.clone()]).unwrap();
    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][5], "GFP x mCherry");
    assert_eq!(&records[1][5], "mCherry x GFP");
    assert!(records.iter().all(|r| r[59].is_empty()));
}
