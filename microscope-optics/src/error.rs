//! Error types for optical calculations.

use thiserror::Error;

/// Errors raised by optical and calibration calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpticsError {
    /// NA exceeds the refractive index, so the half-aperture angle
    /// `asin(NA / n)` is undefined
    #[error("numerical aperture {numerical_aperture} exceeds refractive index {refractive_index}: half-aperture angle is undefined")]
    InvalidOpticalGeometry {
        numerical_aperture: f64,
        refractive_index: f64,
    },
    /// A parameter that must be strictly positive is zero, negative or not finite
    #[error("{parameter} must be positive and finite, got {value}")]
    DegenerateOptics { parameter: &'static str, value: f64 },
    #[error("pixel {axis} must be positive and finite, got {value}")]
    InvalidCalibration { axis: &'static str, value: f64 },
}

/// Check that `value` is strictly positive and finite.
pub(crate) fn require_positive(parameter: &'static str, value: f64) -> Result<f64, OpticsError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(OpticsError::DegenerateOptics { parameter, value })
    }
}
