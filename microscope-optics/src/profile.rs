//! Per-channel resolution profile combining Nyquist sampling and the
//! diffraction limit.

use crate::error::OpticsError;
use crate::nyquist::{nyquist_sampling, NyquistSampling};
use crate::objective::OpticalSystem;
use crate::resolution::{diffraction_limit, DiffractionLimit};
use crate::units::VoxelSize;
use log::debug;
use serde::{Deserialize, Serialize};

/// Sampling and resolution figures for one emission wavelength.
///
/// All lengths are in the image's space unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionProfile {
    pub nyquist_pixel_size_lateral: f64,
    pub nyquist_pixel_size_axial: f64,
    pub nyquist_ratio_lateral: f64,
    pub nyquist_ratio_axial: f64,
    pub resolution_lateral_theoretical: f64,
    pub resolution_axial_theoretical: f64,
    pub resolution_lateral_practical: f64,
    pub resolution_axial_practical: f64,
}

impl ResolutionProfile {
    /// Compute the profile for a wavelength already expressed in the
    /// image's space unit.
    pub fn compute(
        wavelength: f64,
        optics: &OpticalSystem,
        voxel: &VoxelSize,
    ) -> Result<Self, OpticsError> {
        let na = optics.numerical_aperture;
        let n = optics.refractive_index();

        let sampling = nyquist_sampling(wavelength, na, n, voxel)?;
        if sampling.undersampled_lateral() || sampling.undersampled_axial() {
            debug!(
                "Voxel {voxel:?} undersamples wavelength {wavelength}: ratios ({}, {})",
                sampling.ratio_lateral, sampling.ratio_axial
            );
        }
        let limit = diffraction_limit(
            wavelength,
            na,
            n,
            sampling.ratio_lateral,
            sampling.ratio_axial,
        );

        Ok(Self::from_parts(&sampling, &limit))
    }

    pub fn from_parts(sampling: &NyquistSampling, limit: &DiffractionLimit) -> Self {
        Self {
            nyquist_pixel_size_lateral: sampling.pixel_size_lateral,
            nyquist_pixel_size_axial: sampling.pixel_size_axial,
            nyquist_ratio_lateral: sampling.ratio_lateral,
            nyquist_ratio_axial: sampling.ratio_axial,
            resolution_lateral_theoretical: limit.lateral_theoretical,
            resolution_axial_theoretical: limit.axial_theoretical,
            resolution_lateral_practical: limit.lateral_practical,
            resolution_axial_practical: limit.axial_practical,
        }
    }
}
