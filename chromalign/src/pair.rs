//! Registration metrics for one ordered channel pair.
//!
//! # Physics Models
//!
//! Each channel's emission wavelength is converted into the image's space
//! unit and turned into a [`ResolutionProfile`]. The tolerance ellipsoid
//! around spot 1 takes half of the larger practical resolution of the two
//! channels on each axis:
//!
//! ```text
//! semi_minor = max(res_lat_prac₁, res_lat_prac₂) / 2
//! semi_major = max(res_ax_prac₁,  res_ax_prac₂)  / 2
//! ```
//!
//! The colocalization ratios then compare the measured separation with
//! that tolerance:
//!
//! ```text
//! ratio_lateral = d_lateral / semi_minor
//! ratio_axial   = |d_axial| / semi_major
//! ratio_3d      = d_3d / d_3d(spot1, reference point)
//! ```
//!
//! A ratio at or below 1 means the two channels agree within optical
//! resolution.

use crate::error::RegistrationError;
use crate::model::{ChannelPairMetrics, ChannelSpot, ImageCalibration, ReferencePoint};
use crate::settings::AlignmentConfig;
use coloc_math::{euclidean_distance, project_on_ellipsoid, ToleranceEllipsoid};
use log::{debug, warn};
use microscope_optics::{OpticalSystem, ResolutionProfile};
use nalgebra::Vector3;

/// Compute every registration metric for the ordered pair `(ch1, ch2)`.
///
/// Projection non-convergence does not fail the pair: the metrics carry no
/// reference point and no 3D ratio instead.
///
/// # Errors
/// Optics errors from either channel's resolution profile and invalid
/// spots.
pub fn compute_pair_metrics(
    ch1: &ChannelSpot,
    ch2: &ChannelSpot,
    calibration: &ImageCalibration,
    optics: &OpticalSystem,
    config: &AlignmentConfig,
) -> Result<ChannelPairMetrics, RegistrationError> {
    ch1.validate()?;
    ch2.validate()?;

    let unit = calibration.space_unit;
    let voxel = &calibration.voxel;
    let wavelength_1 = unit.from_nanometers(ch1.emission_wavelength_nm);
    let wavelength_2 = unit.from_nanometers(ch2.emission_wavelength_nm);

    let profile_1 = ResolutionProfile::compute(wavelength_1, optics, voxel)?;
    let profile_2 = ResolutionProfile::compute(wavelength_2, optics, voxel)?;

    let semi_minor_axis = profile_1
        .resolution_lateral_practical
        .max(profile_2.resolution_lateral_practical)
        / 2.0;
    let semi_major_axis = profile_1
        .resolution_axial_practical
        .max(profile_2.resolution_axial_practical)
        / 2.0;

    let p1 = ch1.position;
    let p2 = ch2.position;
    let shift = p2 - p1;
    let shift_pixels = calibration.to_pixels(&shift);
    let distances = euclidean_distance(&p1, &p2);

    let ellipsoid = ToleranceEllipsoid::new(p1, semi_minor_axis, semi_major_axis)?;
    let reference = if config
        .coincidence
        .skips_projection(shift.x, shift.y, shift.z)
    {
        debug!(
            "Channels {} and {} share a coordinate, using spot 1 as reference",
            ch1.channel_index, ch2.channel_index
        );
        Some(ReferencePoint {
            position: p1,
            shift: Vector3::zeros(),
            distances: euclidean_distance(&p1, &p1),
            projected: false,
            iterations: 0,
        })
    } else {
        match project_on_ellipsoid(&ellipsoid, &p2, &config.projection) {
            Ok(projection) => Some(ReferencePoint {
                position: projection.point,
                shift: projection.point - p1,
                distances: euclidean_distance(&p1, &projection.point),
                projected: true,
                iterations: projection.iterations,
            }),
            Err(err) => {
                warn!(
                    "No reference point for channels {} x {}: {err}",
                    ch1.channel_index, ch2.channel_index
                );
                None
            }
        }
    };

    let colocalization_ratio_lateral = distances.lateral / semi_minor_axis;
    let colocalization_ratio_axial = distances.axial.abs() / semi_major_axis;
    let colocalization_ratio_3d = reference.map(|r| {
        let reference_distance = r.distances.distance_3d;
        if reference_distance == 0.0 {
            0.0
        } else {
            distances.distance_3d / reference_distance
        }
    });

    debug!(
        "Channels {} x {}: lateral ratio {colocalization_ratio_lateral}, \
         axial ratio {colocalization_ratio_axial}, 3D ratio {colocalization_ratio_3d:?}, \
         spot 2 within tolerance: {}",
        ch1.channel_index,
        ch2.channel_index,
        ellipsoid.contains(&p2)
    );

    Ok(ChannelPairMetrics {
        channel_1: ch1.channel_index,
        channel_2: ch2.channel_index,
        channel_name_1: ch1.channel_name.clone(),
        channel_name_2: ch2.channel_name.clone(),
        position_1: p1,
        position_2: p2,
        shift,
        shift_pixels,
        voxel: *voxel,
        space_unit: unit,
        distances,
        numerical_aperture: optics.numerical_aperture,
        immersion: optics.immersion.clone(),
        refractive_index: optics.refractive_index(),
        emission_wavelength_nm_1: ch1.emission_wavelength_nm,
        emission_wavelength_nm_2: ch2.emission_wavelength_nm,
        conversion_factor: unit.nm_conversion_factor(),
        emission_wavelength_1: wavelength_1,
        emission_wavelength_2: wavelength_2,
        profile_1,
        profile_2,
        semi_minor_axis,
        semi_major_axis,
        reference,
        colocalization_ratio_lateral,
        colocalization_ratio_axial,
        colocalization_ratio_3d,
    })
}
