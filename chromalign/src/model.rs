//! Inputs and results of channel registration.
//!
//! [`ChannelSpot`] and [`ImageCalibration`] are built once per image from
//! detection and metadata. [`ChannelPairMetrics`] is the derived record for
//! one ordered channel pair; [`ImageAlignment`] collects every pair of one
//! image.

use crate::error::RegistrationError;
use coloc_math::Distances;
use microscope_optics::{
    ImmersionMedium, OpticalSystem, OpticsError, ResolutionProfile, SpaceUnit, VoxelSize,
};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// The single validated bead localization of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpot {
    /// 1-based channel number
    pub channel_index: u32,
    pub channel_name: String,
    pub emission_wavelength_nm: f64,
    /// Sub-pixel position in calibrated space units
    pub position: Point3<f64>,
    /// Detector quality score of the accepted spot
    pub detection_quality: f64,
}

impl ChannelSpot {
    pub fn new(
        channel_index: u32,
        channel_name: impl Into<String>,
        emission_wavelength_nm: f64,
        position: Point3<f64>,
        detection_quality: f64,
    ) -> Result<Self, RegistrationError> {
        let spot = Self {
            channel_index,
            channel_name: channel_name.into(),
            emission_wavelength_nm,
            position,
            detection_quality,
        };
        spot.validate()?;
        Ok(spot)
    }

    /// Check channel index, wavelength and position.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.channel_index == 0 {
            return Err(RegistrationError::InvalidChannelIndex(self.channel_index));
        }
        if !(self.emission_wavelength_nm.is_finite() && self.emission_wavelength_nm > 0.0) {
            return Err(OpticsError::DegenerateOptics {
                parameter: "emission wavelength",
                value: self.emission_wavelength_nm,
            }
            .into());
        }
        if !self.position.iter().all(|c| c.is_finite()) {
            return Err(RegistrationError::NonFinitePosition {
                channel: self.channel_index,
            });
        }
        Ok(())
    }

    /// Label used in reports, e.g. "Channel 02"
    pub fn label(&self) -> String {
        channel_label(self.channel_index)
    }
}

pub fn channel_label(channel_index: u32) -> String {
    format!("Channel {channel_index:02}")
}

/// Spatial calibration of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCalibration {
    pub voxel: VoxelSize,
    pub space_unit: SpaceUnit,
    pub time_unit: String,
}

impl ImageCalibration {
    pub fn new(voxel: VoxelSize, space_unit: SpaceUnit, time_unit: impl Into<String>) -> Self {
        Self {
            voxel,
            space_unit,
            time_unit: time_unit.into(),
        }
    }

    /// Build a calibration from raw metadata values, normalizing the unit.
    pub fn from_raw(
        pixel_width: f64,
        pixel_height: f64,
        pixel_depth: f64,
        space_unit: &str,
        time_unit: impl Into<String>,
    ) -> Result<Self, OpticsError> {
        let voxel = VoxelSize::new(pixel_width, pixel_height, pixel_depth)?;
        Ok(Self::new(voxel, SpaceUnit::normalize(space_unit), time_unit))
    }

    /// Express a calibrated shift in pixels along each axis.
    pub fn to_pixels(&self, shift: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            shift.x / self.voxel.width,
            shift.y / self.voxel.height,
            shift.z / self.voxel.depth,
        )
    }
}

/// Point where the spot1 -> spot2 line meets the tolerance ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub position: Point3<f64>,
    /// `position - spot1`
    pub shift: Vector3<f64>,
    /// Distances from spot1 to `position`
    pub distances: Distances,
    /// False when the search was skipped and spot1 itself is used
    pub projected: bool,
    pub iterations: usize,
}

/// Registration metrics for one ordered channel pair.
///
/// Lengths are in `space_unit` unless the field name says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPairMetrics {
    pub channel_1: u32,
    pub channel_2: u32,
    pub channel_name_1: String,
    pub channel_name_2: String,

    pub position_1: Point3<f64>,
    pub position_2: Point3<f64>,
    /// `position_2 - position_1`
    pub shift: Vector3<f64>,
    pub shift_pixels: Vector3<f64>,
    pub voxel: VoxelSize,
    pub space_unit: SpaceUnit,
    pub distances: Distances,

    pub numerical_aperture: f64,
    pub immersion: ImmersionMedium,
    pub refractive_index: f64,

    pub emission_wavelength_nm_1: f64,
    pub emission_wavelength_nm_2: f64,
    /// Nanometers per space unit used for the wavelength conversion
    pub conversion_factor: f64,
    pub emission_wavelength_1: f64,
    pub emission_wavelength_2: f64,

    pub profile_1: ResolutionProfile,
    pub profile_2: ResolutionProfile,

    /// Lateral semi-axis of the tolerance ellipsoid
    pub semi_minor_axis: f64,
    /// Axial semi-axis of the tolerance ellipsoid
    pub semi_major_axis: f64,

    /// `None` when the projection did not converge
    pub reference: Option<ReferencePoint>,

    pub colocalization_ratio_lateral: f64,
    pub colocalization_ratio_axial: f64,
    /// `None` when there is no reference point
    pub colocalization_ratio_3d: Option<f64>,
}

impl ChannelPairMetrics {
    /// "name1 x name2"
    pub fn channel_pair_label(&self) -> String {
        format!("{} x {}", self.channel_name_1, self.channel_name_2)
    }

    pub fn is_self_pair(&self) -> bool {
        self.channel_1 == self.channel_2
    }

    pub fn reference_distance_3d(&self) -> Option<f64> {
        self.reference.map(|r| r.distances.distance_3d)
    }
}

/// A channel pair whose metrics could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub channel_1: u32,
    pub channel_2: u32,
    pub channel_name_1: String,
    pub channel_name_2: String,
    pub error: RegistrationError,
}

/// Every channel pair of one image.
#[derive(Debug, Clone)]
pub struct ImageAlignment {
    pub image_name: String,
    /// Source file name, used for reporting and filename variables
    pub filename: String,
    pub calibration: ImageCalibration,
    pub optics: OpticalSystem,
    /// Ordered by (channel_1, channel_2)
    pub rows: Vec<ChannelPairMetrics>,
    pub failures: Vec<PairFailure>,
}

impl ImageAlignment {
    pub fn space_unit(&self) -> SpaceUnit {
        self.calibration.space_unit
    }

    pub fn pair(&self, channel_1: u32, channel_2: u32) -> Option<&ChannelPairMetrics> {
        self.rows
            .iter()
            .find(|r| r.channel_1 == channel_1 && r.channel_2 == channel_2)
    }

    /// Largest 3D colocalization ratio among the computed pairs
    pub fn worst_colocalization_ratio_3d(&self) -> Option<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.colocalization_ratio_3d)
            .fold(None, |acc, ratio| Some(acc.map_or(ratio, |a: f64| a.max(ratio))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_channel_spot_validation() {
        let origin = Point3::origin();
        assert!(ChannelSpot::new(1, "DAPI", 425.0, origin, 10.0).is_ok());
        assert_eq!(
            ChannelSpot::new(0, "DAPI", 425.0, origin, 10.0),
            Err(RegistrationError::InvalidChannelIndex(0))
        );
        assert!(matches!(
            ChannelSpot::new(1, "DAPI", 0.0, origin, 10.0),
            Err(RegistrationError::Optics(OpticsError::DegenerateOptics { .. }))
        ));
        assert!(matches!(
            ChannelSpot::new(2, "GFP", 510.0, Point3::new(f64::NAN, 0.0, 0.0), 1.0),
            Err(RegistrationError::NonFinitePosition { channel: 2 })
        ));
    }

    #[test]
    fn test_labels() {
        let spot = ChannelSpot::new(3, "Alexa555", 555.0, Point3::origin(), 1.0).unwrap();
        assert_eq!(spot.label(), "Channel 03");
        assert_eq!(channel_label(12), "Channel 12");
    }

    #[test]
    fn test_calibration_from_raw_normalizes_unit() {
        let cal = ImageCalibration::from_raw(0.1, 0.1, 0.3, "micron", "sec").unwrap();
        assert_eq!(cal.space_unit, SpaceUnit::Micrometer);
        assert_eq!(cal.time_unit, "sec");

        let shift = Vector3::new(0.25, -0.1, 0.6);
        let px = cal.to_pixels(&shift);
        assert_relative_eq!(px.x, 2.5, epsilon = 1e-12);
        assert_relative_eq!(px.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(px.z, 2.0, epsilon = 1e-12);

        assert!(ImageCalibration::from_raw(0.0, 0.1, 0.3, "micron", "sec").is_err());
    }
}
