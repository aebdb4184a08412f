//! Nyquist sampling criterion for a widefield/confocal objective.
//!
//! # Physics Models
//!
//! - **Lateral Nyquist pixel**: `λ / (4·NA)`
//! - **Axial Nyquist step**: `λ / (2·n·(1 − cos θ))` with `θ = asin(NA / n)`
//! - **Sampling ratio**: actual pixel size divided by the Nyquist size.
//!   A ratio above 1 means the grid undersamples the optical resolution.
//!
//! All lengths share the image's space unit; the wavelength must already
//! be converted into it.

use crate::error::{require_positive, OpticsError};
use crate::objective::half_aperture_angle;
use crate::units::VoxelSize;
use log::debug;
use serde::{Deserialize, Serialize};

/// Nyquist pixel sizes and the corresponding sampling ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NyquistSampling {
    pub pixel_size_lateral: f64,
    pub pixel_size_axial: f64,
    /// Pixel width over the lateral Nyquist size
    pub ratio_lateral: f64,
    /// Pixel depth over the axial Nyquist size
    pub ratio_axial: f64,
}

impl NyquistSampling {
    pub fn undersampled_lateral(&self) -> bool {
        self.ratio_lateral > 1.0
    }

    pub fn undersampled_axial(&self) -> bool {
        self.ratio_axial > 1.0
    }
}

/// Compute Nyquist pixel sizes and sampling ratios.
///
/// Only the voxel width enters the lateral ratio; square pixels are
/// assumed.
///
/// # Arguments
/// * `wavelength` - Emission wavelength in the image's space unit
/// * `numerical_aperture` - Objective NA
/// * `refractive_index` - Immersion medium refractive index
/// * `voxel` - Pixel width/height/depth in the image's space unit
///
/// # Errors
/// * `OpticsError::InvalidOpticalGeometry` when `NA / n > 1`
/// * `OpticsError::DegenerateOptics` for a non-positive wavelength or NA
pub fn nyquist_sampling(
    wavelength: f64,
    numerical_aperture: f64,
    refractive_index: f64,
    voxel: &VoxelSize,
) -> Result<NyquistSampling, OpticsError> {
    require_positive("wavelength", wavelength)?;
    voxel.validate()?;
    let theta = half_aperture_angle(numerical_aperture, refractive_index)?;

    let pixel_size_lateral = wavelength / (4.0 * numerical_aperture);
    let pixel_size_axial = wavelength / (2.0 * refractive_index * (1.0 - theta.cos()));

    let sampling = NyquistSampling {
        pixel_size_lateral,
        pixel_size_axial,
        ratio_lateral: voxel.width / pixel_size_lateral,
        ratio_axial: voxel.depth / pixel_size_axial,
    };

    debug!(
        "Nyquist for wavelength={wavelength}, NA={numerical_aperture}, \
         n={refractive_index}, voxel={voxel:?}: {sampling:?}"
    );

    Ok(sampling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_oil_objective_at_510nm() {
        // 510 nm in µm, 1.4 NA oil, 100 nm isotropic voxels
        let voxel = VoxelSize::isotropic(0.1).unwrap();
        let n = nyquist_sampling(0.51, 1.4, 1.515, &voxel).unwrap();

        assert_relative_eq!(n.pixel_size_lateral, 0.0910714, epsilon = 1e-6);
        assert_relative_eq!(n.ratio_lateral, 1.0980392, epsilon = 1e-6);
        assert_relative_eq!(n.pixel_size_axial, 0.2724319, epsilon = 1e-6);
        assert_relative_eq!(n.ratio_axial, 0.3670642, epsilon = 1e-6);
        assert!(n.undersampled_lateral());
        assert!(!n.undersampled_axial());
    }

    #[test]
    fn test_invalid_geometry_is_reported() {
        let voxel = VoxelSize::isotropic(0.1).unwrap();
        let err = nyquist_sampling(0.51, 1.4, 1.0003, &voxel).unwrap_err();
        assert_eq!(
            err,
            OpticsError::InvalidOpticalGeometry {
                numerical_aperture: 1.4,
                refractive_index: 1.0003
            }
        );
    }

    #[test]
    fn test_degenerate_inputs_are_rejected() {
        let voxel = VoxelSize::isotropic(0.1).unwrap();
        assert!(matches!(
            nyquist_sampling(0.0, 1.4, 1.515, &voxel),
            Err(OpticsError::DegenerateOptics { parameter: "wavelength", .. })
        ));
        assert!(matches!(
            nyquist_sampling(0.51, 0.0, 1.515, &voxel),
            Err(OpticsError::DegenerateOptics { .. })
        ));
    }

    #[test]
    fn test_nyquist_sizes_positive_over_valid_range() {
        let voxel = VoxelSize::new(0.065, 0.065, 0.2).unwrap();
        for &n in &[1.0003, 1.333, 1.40, 1.47, 1.515] {
            for step in 1..=20 {
                let na = n * step as f64 / 20.0;
                for &wavelength in &[0.35, 0.51, 0.7, 1.1] {
                    let s = nyquist_sampling(wavelength, na, n, &voxel).unwrap();
                    assert!(s.pixel_size_lateral > 0.0);
                    assert!(s.pixel_size_axial > 0.0);
                    assert!(s.ratio_lateral > 0.0);
                    assert!(s.ratio_axial > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_ratio_scales_with_pixel_size() {
        let fine_voxel = VoxelSize::isotropic(0.05).unwrap();
        let coarse_voxel = VoxelSize::isotropic(0.1).unwrap();
        let fine = nyquist_sampling(0.51, 1.4, 1.515, &fine_voxel).unwrap();
        let coarse = nyquist_sampling(0.51, 1.4, 1.515, &coarse_voxel).unwrap();
        assert_relative_eq!(coarse.ratio_lateral, 2.0 * fine.ratio_lateral, epsilon = 1e-12);
        assert_relative_eq!(coarse.pixel_size_lateral, fine.pixel_size_lateral);
    }
}
