//! Spatial units for image calibration.
//!
//! Acquisition software reports the calibrated space unit as free text
//! ("micron", "µm", "um", "nanometers", ...). Everything downstream works
//! in one normalized [`SpaceUnit`], and emission wavelengths (always given
//! in nanometers) are converted into that unit with a fixed factor table.

use crate::error::OpticsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized space unit of an image calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpaceUnit {
    #[default]
    Micrometer,
    Nanometer,
    Millimeter,
    Centimeter,
    Meter,
    Inch,
    /// Uncalibrated image, distances are in pixels
    Pixel,
}

impl SpaceUnit {
    /// Map a raw unit string onto a normalized unit.
    ///
    /// Matching is case-insensitive. Unrecognized strings (including the
    /// empty string) are treated as uncalibrated pixels.
    pub fn normalize(raw: &str) -> SpaceUnit {
        match raw.trim().to_lowercase().as_str() {
            "micron" | "microns" | "µm" | "μm" | "um" | "u" | "micrometer" | "micrometers" => {
                SpaceUnit::Micrometer
            }
            "nm" | "nanometer" | "nanometers" => SpaceUnit::Nanometer,
            "mm" | "millimeter" | "millimeters" => SpaceUnit::Millimeter,
            "cm" | "centimeter" | "centimeters" => SpaceUnit::Centimeter,
            "m" | "meter" | "meters" => SpaceUnit::Meter,
            "in" | "inch" | "inches" => SpaceUnit::Inch,
            _ => SpaceUnit::Pixel,
        }
    }

    /// Short label used in report headers
    pub fn symbol(&self) -> &'static str {
        match self {
            SpaceUnit::Micrometer => "µm",
            SpaceUnit::Nanometer => "nm",
            SpaceUnit::Millimeter => "mm",
            SpaceUnit::Centimeter => "cm",
            SpaceUnit::Meter => "m",
            SpaceUnit::Inch => "in",
            SpaceUnit::Pixel => "pixels",
        }
    }

    /// Divisor turning a wavelength in nanometers into this unit.
    ///
    /// Pixels use 1.0 since there is no physical scale to apply.
    pub fn nm_conversion_factor(&self) -> f64 {
        match self {
            SpaceUnit::Micrometer => 1_000.0,
            SpaceUnit::Nanometer => 1.0,
            SpaceUnit::Millimeter => 1_000_000.0,
            SpaceUnit::Centimeter => 10_000_000.0,
            SpaceUnit::Meter => 1_000_000_000.0,
            SpaceUnit::Inch => 2_540_000.0,
            SpaceUnit::Pixel => 1.0,
        }
    }

    /// Convert a wavelength in nanometers into this unit
    pub fn from_nanometers(&self, nm: f64) -> f64 {
        nm / self.nm_conversion_factor()
    }

    pub fn is_calibrated(&self) -> bool {
        !matches!(self, SpaceUnit::Pixel)
    }
}

impl From<String> for SpaceUnit {
    fn from(raw: String) -> Self {
        SpaceUnit::normalize(&raw)
    }
}

impl From<SpaceUnit> for String {
    fn from(unit: SpaceUnit) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for SpaceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Physical size of one voxel, in the image's space unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelSize {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl VoxelSize {
    /// Create a voxel size, rejecting non-positive or non-finite extents
    pub fn new(width: f64, height: f64, depth: f64) -> Result<Self, OpticsError> {
        let voxel = Self {
            width,
            height,
            depth,
        };
        voxel.validate()?;
        Ok(voxel)
    }

    /// Cubic voxel with the same extent along every axis
    pub fn isotropic(size: f64) -> Result<Self, OpticsError> {
        Self::new(size, size, size)
    }

    pub fn validate(&self) -> Result<(), OpticsError> {
        for (axis, value) in [
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(OpticsError::InvalidCalibration { axis, value });
            }
        }
        Ok(())
    }
}
