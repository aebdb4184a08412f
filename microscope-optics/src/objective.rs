//! Objective lens configuration for fluorescence microscopy.
//!
//! An [`OpticalSystem`] pairs the objective's numerical aperture with the
//! immersion medium it was designed for. The refractive index is derived
//! from the medium, never stored separately, so the two cannot disagree.
//!
//! # Examples
//!
//! ```rust
//! use microscope_optics::objective::{models::PLAN_APO_63X_OIL, OpticalSystem};
//! use microscope_optics::ImmersionMedium;
//!
//! let optics = PLAN_APO_63X_OIL.optics.clone();
//! assert_eq!(optics.refractive_index(), 1.515);
//!
//! let water = OpticalSystem::new(1.2, ImmersionMedium::Water).unwrap();
//! assert!(water.half_aperture_angle().is_ok());
//! ```

use crate::error::{require_positive, OpticsError};
use crate::immersion::ImmersionMedium;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Numerical aperture and immersion medium of the imaging objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalSystem {
    /// Objective numerical aperture (> 0)
    pub numerical_aperture: f64,
    pub immersion: ImmersionMedium,
}

impl OpticalSystem {
    /// Create an optical system, rejecting a non-positive NA.
    ///
    /// An NA larger than the medium's refractive index is accepted here and
    /// reported by the Nyquist calculation, which is where it becomes
    /// physically meaningless.
    pub fn new(numerical_aperture: f64, immersion: ImmersionMedium) -> Result<Self, OpticsError> {
        require_positive("numerical aperture", numerical_aperture)?;
        Ok(Self {
            numerical_aperture,
            immersion,
        })
    }

    /// Refractive index of the immersion medium (1.0 when unknown)
    pub fn refractive_index(&self) -> f64 {
        self.immersion.refractive_index()
    }

    /// Half-aperture angle `asin(NA / n)` in radians.
    pub fn half_aperture_angle(&self) -> Result<f64, OpticsError> {
        half_aperture_angle(self.numerical_aperture, self.refractive_index())
    }
}

/// Half-aperture angle `asin(NA / n)` in radians.
///
/// # Errors
/// `OpticsError::InvalidOpticalGeometry` when `NA / n > 1`.
pub fn half_aperture_angle(
    numerical_aperture: f64,
    refractive_index: f64,
) -> Result<f64, OpticsError> {
    require_positive("numerical aperture", numerical_aperture)?;
    require_positive("refractive index", refractive_index)?;

    let sin_theta = numerical_aperture / refractive_index;
    if sin_theta > 1.0 {
        return Err(OpticsError::InvalidOpticalGeometry {
            numerical_aperture,
            refractive_index,
        });
    }
    Ok(sin_theta.asin())
}

/// A catalogued objective
#[derive(Debug, Clone)]
pub struct ObjectiveModel {
    pub name: String,
    /// Nominal magnification, e.g. "63x"
    pub magnification: String,
    pub optics: OpticalSystem,
}

impl ObjectiveModel {
    fn new(
        name: &str,
        magnification: &str,
        numerical_aperture: f64,
        immersion: ImmersionMedium,
    ) -> Self {
        Self {
            name: name.to_string(),
            magnification: magnification.to_string(),
            optics: OpticalSystem {
                numerical_aperture,
                immersion,
            },
        }
    }
}

/// Common objective configurations
pub mod models {
    use super::*;

    pub static PLAN_FLUOR_5X_AIR: Lazy<ObjectiveModel> =
        Lazy::new(|| ObjectiveModel::new("Plan Fluor 5x", "5x", 0.15, ImmersionMedium::Air));

    pub static PLAN_APO_20X_AIR: Lazy<ObjectiveModel> =
        Lazy::new(|| ObjectiveModel::new("Plan Apo 20x", "20x", 0.75, ImmersionMedium::Air));

    pub static PLAN_APO_40X_WATER: Lazy<ObjectiveModel> =
        Lazy::new(|| ObjectiveModel::new("Plan Apo 40x W", "40x", 1.2, ImmersionMedium::Water));

    pub static PLAN_APO_60X_SILICONE: Lazy<ObjectiveModel> = Lazy::new(|| {
        ObjectiveModel::new("Plan Apo 60x Sil", "60x", 1.3, ImmersionMedium::Silicone)
    });

    pub static PLAN_APO_63X_OIL: Lazy<ObjectiveModel> =
        Lazy::new(|| ObjectiveModel::new("Plan Apo 63x Oil", "63x", 1.4, ImmersionMedium::Oil));

    pub static PLAN_APO_100X_OIL: Lazy<ObjectiveModel> =
        Lazy::new(|| ObjectiveModel::new("Plan Apo 100x Oil", "100x", 1.45, ImmersionMedium::Oil));
}


#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_predefined_objectives() {
        assert_eq!(models::PLAN_APO_63X_OIL.magnification, "63x");
        assert_eq!(models::PLAN_APO_63X_OIL.optics.numerical_aperture, 1.4);
        assert_eq!(models::PLAN_APO_63X_OIL.optics.refractive_index(), 1.515);

        assert_eq!(models::PLAN_APO_40X_WATER.optics.refractive_index(), 1.333);
        assert_eq!(models::PLAN_APO_60X_SILICONE.optics.refractive_index(), 1.40);
    }

    #[test]
    fn test_predefined_objectives_have_valid_geometry() {
        for model in [
            &*models::PLAN_FLUOR_5X_AIR,
            &*models::PLAN_APO_20X_AIR,
            &*models::PLAN_APO_40X_WATER,
            &*models::PLAN_APO_60X_SILICONE,
            &*models::PLAN_APO_63X_OIL,
            &*models::PLAN_APO_100X_OIL,
        ] {
            assert!(model.optics.half_aperture_angle().is_ok(), "{}", model.name);
        }
    }
}
