//! Diffraction-limited resolution, theoretical and as sampled.
//!
//! - **Lateral**: `0.51·λ / NA`
//! - **Axial**: `1.77·n·λ / NA²`
//!
//! The practical resolution inflates the theoretical value by the Nyquist
//! ratio when the pixel grid undersamples (ratio > 1); otherwise it is the
//! theoretical value. Lateral and axial are treated independently.

use log::debug;
use serde::{Deserialize, Serialize};

const LATERAL_FACTOR: f64 = 0.51;
const AXIAL_FACTOR: f64 = 1.77;

/// Resolvable distances, in the image's space unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffractionLimit {
    pub lateral_theoretical: f64,
    pub axial_theoretical: f64,
    pub lateral_practical: f64,
    pub axial_practical: f64,
}

/// Theoretical and practical resolution for one emission wavelength.
///
/// Inputs are expected to be validated already (positive wavelength and
/// NA); see [`crate::nyquist::nyquist_sampling`] which performs the checks
/// and produces the ratios passed here.
pub fn diffraction_limit(
    wavelength: f64,
    numerical_aperture: f64,
    refractive_index: f64,
    nyquist_ratio_lateral: f64,
    nyquist_ratio_axial: f64,
) -> DiffractionLimit {
    let lateral_theoretical = LATERAL_FACTOR * wavelength / numerical_aperture;
    let axial_theoretical =
        AXIAL_FACTOR * refractive_index * wavelength / (numerical_aperture * numerical_aperture);

    let limit = DiffractionLimit {
        lateral_theoretical,
        axial_theoretical,
        lateral_practical: undersampling_adjusted(lateral_theoretical, nyquist_ratio_lateral),
        axial_practical: undersampling_adjusted(axial_theoretical, nyquist_ratio_axial),
    };

    debug!(
        "Resolution for wavelength={wavelength}, NA={numerical_aperture}, \
         n={refractive_index}, ratios=({nyquist_ratio_lateral}, {nyquist_ratio_axial}): {limit:?}"
    );

    limit
}

fn undersampling_adjusted(theoretical: f64, nyquist_ratio: f64) -> f64 {
    if nyquist_ratio > 1.0 {
        theoretical * nyquist_ratio
    } else {
        theoretical
    }
}
