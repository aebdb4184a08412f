//! Per-image measurement files.
//!
//! A measurement file is the JSON hand-off from spot detection: the image
//! calibration, optional acquisition metadata and the spots detected in
//! each channel. Detection is expected to deliver exactly one spot per
//! channel; [`ImageMeasurement::validate_single_spot_per_channel`] enforces
//! that before anything is computed.
//!
//! # Examples
//!
//! ```json
//! {
//!   "image_name": "beads_63x_001",
//!   "filename": "beads_63x_001.czi",
//!   "nb_channels": 2,
//!   "calibration": {
//!     "pixel_width": 0.1, "pixel_height": 0.1, "pixel_depth": 0.3,
//!     "space_unit": "micron", "time_unit": "sec"
//!   },
//!   "spots": [
//!     { "channel": 1, "x": 1.02, "y": 2.31, "z": 3.3, "quality": 85.0 },
//!     { "channel": 2, "x": 1.07, "y": 2.29, "z": 3.5, "quality": 64.2 }
//!   ]
//! }
//! ```

use crate::engine::AlignmentInput;
use crate::error::MeasurementError;
use crate::model::{ChannelSpot, ImageCalibration};
use crate::settings::{ImageMetadata, MicroscopeSettings};
use log::{debug, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Raw calibration values as reported by the acquisition software
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub pixel_depth: f64,
    #[serde(default)]
    pub space_unit: String,
    #[serde(default)]
    pub time_unit: String,
}

/// One spot reported by detection, in calibrated units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedSpot {
    /// 1-based channel number
    pub channel: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub quality: f64,
}

impl DetectedSpot {
    pub fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeasurement {
    pub image_name: String,
    pub filename: String,
    pub nb_channels: u32,
    pub calibration: CalibrationRecord,
    #[serde(default)]
    pub metadata: Option<ImageMetadata>,
    pub spots: Vec<DetectedSpot>,
}

impl ImageMeasurement {
    pub fn load_from_file(path: &Path) -> Result<Self, MeasurementError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), MeasurementError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Index the spots by channel, requiring exactly one per channel.
    pub fn validate_single_spot_per_channel(
        &self,
    ) -> Result<BTreeMap<u32, &DetectedSpot>, MeasurementError> {
        if self.nb_channels == 0 {
            return Err(MeasurementError::NoChannels);
        }

        let mut by_channel: BTreeMap<u32, Vec<&DetectedSpot>> = BTreeMap::new();
        for spot in &self.spots {
            if spot.channel == 0 || spot.channel > self.nb_channels {
                return Err(MeasurementError::UnknownChannel {
                    channel: spot.channel,
                    nb_channels: self.nb_channels,
                });
            }
            by_channel.entry(spot.channel).or_default().push(spot);
        }

        (1..=self.nb_channels)
            .map(|channel| match by_channel.get(&channel).map(Vec::as_slice) {
                None | Some([]) => Err(MeasurementError::MissingSpot { channel }),
                Some([spot]) => Ok((channel, *spot)),
                Some(spots) => Err(MeasurementError::MultipleSpots {
                    channel,
                    count: spots.len(),
                }),
            })
            .collect()
    }

    /// Build the engine input.
    ///
    /// Optics and channel descriptions come from `settings`; the image
    /// metadata only fills channels the settings do not describe.
    pub fn to_alignment_input(
        &self,
        settings: &MicroscopeSettings,
    ) -> Result<AlignmentInput, MeasurementError> {
        let spots_by_channel = self.validate_single_spot_per_channel()?;

        let calibration = ImageCalibration::from_raw(
            self.calibration.pixel_width,
            self.calibration.pixel_height,
            self.calibration.pixel_depth,
            &self.calibration.space_unit,
            self.calibration.time_unit.clone(),
        )?;
        if !calibration.space_unit.is_calibrated() {
            warn!(
                "{}: unit {:?} is not a length, distances and resolutions are in pixels",
                self.image_name, self.calibration.space_unit
            );
        }

        let resolved = settings.resolve(self.metadata.as_ref(), self.nb_channels);
        let optics = resolved.optical_system()?;

        let spots = spots_by_channel
            .into_iter()
            .map(|(channel, detected)| {
                let description = resolved
                    .channel(channel)
                    .ok_or(MeasurementError::MissingWavelength { channel })?;
                Ok(ChannelSpot::new(
                    channel,
                    description.name,
                    description.emission_wavelength_nm,
                    detected.position(),
                    detected.quality,
                )?)
            })
            .collect::<Result<Vec<_>, MeasurementError>>()?;

        debug!(
            "{}: {} channels, unit {}, NA {}, {}",
            self.image_name,
            spots.len(),
            calibration.space_unit,
            optics.numerical_aperture,
            optics.immersion
        );

        Ok(AlignmentInput {
            image_name: self.image_name.clone(),
            filename: self.filename.clone(),
            spots,
            calibration,
            optics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microscope_optics::{ImmersionMedium, SpaceUnit};

    fn measurement() -> ImageMeasurement {
        serde_json::from_str(
            r#"{
                "image_name": "beads_001",
                "filename": "beads_001.czi",
                "nb_channels": 2,
                "calibration": {
                    "pixel_width": 0.1, "pixel_height": 0.1, "pixel_depth": 0.3,
                    "space_unit": "micron", "time_unit": "sec"
                },
                "spots": [
                    { "channel": 2, "x": 1.07, "y": 2.29, "z": 3.5, "quality": 64.2 },
                    { "channel": 1, "x": 1.02, "y": 2.31, "z": 3.3, "quality": 85.0 }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_single_spot_per_channel() {
        let m = measurement();
        let spots = m.validate_single_spot_per_channel().unwrap();
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[&1].quality, 85.0);
        assert_eq!(spots[&2].x, 1.07);
    }

    #[test]
    fn test_missing_and_duplicate_spots() {
        let mut m = measurement();
        m.spots.remove(0);
        assert!(matches!(
            m.validate_single_spot_per_channel(),
            Err(MeasurementError::MissingSpot { channel: 2 })
        ));

        let mut m = measurement();
        let extra = m.spots[1].clone();
        m.spots.push(extra);
        assert!(matches!(
            m.validate_single_spot_per_channel(),
            Err(MeasurementError::MultipleSpots { channel: 1, count: 2 })
        ));

        let mut m = measurement();
        m.spots[0].channel = 5;
        assert!(matches!(
            m.validate_single_spot_per_channel(),
            Err(MeasurementError::UnknownChannel { channel: 5, nb_channels: 2 })
        ));

        let mut m = measurement();
        m.nb_channels = 0;
        assert!(matches!(
            m.validate_single_spot_per_channel(),
            Err(MeasurementError::NoChannels)
        ));
    }

    #[test]
    fn test_alignment_input_from_settings() {
        let input = measurement()
            .to_alignment_input(&MicroscopeSettings::default())
            .unwrap();

        assert_eq!(input.calibration.space_unit, SpaceUnit::Micrometer);
        assert_eq!(input.optics.immersion, ImmersionMedium::Air);
        assert_eq!(input.spots.len(), 2);
        assert_eq!(input.spots[0].channel_index, 1);
        assert_eq!(input.spots[0].channel_name, "DAPI");
        assert_eq!(input.spots[1].emission_wavelength_nm, 488.0);
        assert_eq!(input.spots[1].position, Point3::new(1.07, 2.29, 3.5));
    }

    #[test]
    fn test_settings_win_over_metadata() {
        let mut m = measurement();
        m.metadata = Some(ImageMetadata {
            objective_magnification: Some("63x".to_string()),
            numerical_aperture: Some(1.4),
            immersion: Some("oil".to_string()),
            channel_names: vec!["GFP".to_string(), "mCherry".to_string()],
            emission_wavelengths_nm: vec![510.0, 610.0],
        });
        let settings = MicroscopeSettings {
            objective_magnification: "60x".to_string(),
            objective_na: 1.2,
            objective_immersion: "Water".to_string(),
            ..MicroscopeSettings::default()
        };

        let input = m.to_alignment_input(&settings).unwrap();
        assert_eq!(input.optics.numerical_aperture, 1.2);
        assert_eq!(input.optics.immersion, ImmersionMedium::Water);
        assert_eq!(input.optics.refractive_index(), 1.333);
        assert_eq!(input.spots[1].channel_name, "Alexa488");
        assert_eq!(input.spots[1].emission_wavelength_nm, 488.0);
    }

    #[test]
    fn test_metadata_describes_unconfigured_channel() {
        let mut settings = MicroscopeSettings::default();
        settings.channel_names.truncate(1);
        settings.emission_wavelengths_nm.truncate(1);

        let mut m = measurement();
        m.metadata = Some(ImageMetadata {
            channel_names: vec!["GFP".to_string(), "mCherry".to_string()],
            emission_wavelengths_nm: vec![510.0, 610.0],
            ..ImageMetadata::default()
        });

        let input = m.to_alignment_input(&settings).unwrap();
        assert_eq!(input.spots[0].channel_name, "DAPI");
        assert_eq!(input.spots[1].channel_name, "mCherry");
        assert_eq!(input.spots[1].emission_wavelength_nm, 610.0);
    }

    #[test]
    fn test_uncalibrated_image_is_accepted_in_pixels() {
        let mut m = measurement();
        m.calibration.space_unit = "pixel".to_string();
        let input = m.to_alignment_input(&MicroscopeSettings::default()).unwrap();
        assert_eq!(input.calibration.space_unit, SpaceUnit::Pixel);
    }

    #[test]
    fn test_missing_wavelength_for_extra_channel() {
        let mut settings = MicroscopeSettings::default();
        settings.channel_names.truncate(1);
        settings.emission_wavelengths_nm.truncate(1);

        assert!(matches!(
            measurement().to_alignment_input(&settings),
            Err(MeasurementError::MissingWavelength { channel: 2 })
        ));
    }

    #[test]
    fn test_bad_calibration_is_rejected() {
        let mut m = measurement();
        m.calibration.pixel_depth = 0.0;
        assert!(matches!(
            m.to_alignment_input(&MicroscopeSettings::default()),
            Err(MeasurementError::Optics(_))
        ));
    }
}
