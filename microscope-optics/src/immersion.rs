//! Immersion media and their refractive indices.
//!
//! The lookup never fails: an unrecognized medium maps to a refractive
//! index of 1.0, so metadata written by unfamiliar acquisition software
//! still flows through the rest of the computation.

use log::debug;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Refractive index used when the medium is not in the table
pub const UNKNOWN_REFRACTIVE_INDEX: f64 = 1.0;

/// Objective immersion medium.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImmersionMedium {
    Air,
    Water,
    Oil,
    Glycerin,
    Silicone,
    /// Any other name, kept verbatim for reporting
    Unknown(String),
}

impl ImmersionMedium {
    /// Refractive index of the medium.
    pub fn refractive_index(&self) -> f64 {
        match self {
            ImmersionMedium::Air => 1.0003,
            ImmersionMedium::Water => 1.333,
            ImmersionMedium::Oil => 1.515,
            ImmersionMedium::Glycerin => 1.47,
            ImmersionMedium::Silicone => 1.40,
            ImmersionMedium::Unknown(_) => UNKNOWN_REFRACTIVE_INDEX,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ImmersionMedium::Air => "Air",
            ImmersionMedium::Water => "Water",
            ImmersionMedium::Oil => "Oil",
            ImmersionMedium::Glycerin => "Glycerin",
            ImmersionMedium::Silicone => "Silicone",
            ImmersionMedium::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ImmersionMedium::Unknown(_))
    }
}

impl FromStr for ImmersionMedium {
    type Err = Infallible;

    /// Case-insensitive; `Glycerol` (the OME spelling) is accepted for glycerin.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let medium = match s.trim().to_ascii_lowercase().as_str() {
            "air" => ImmersionMedium::Air,
            "water" => ImmersionMedium::Water,
            "oil" => ImmersionMedium::Oil,
            "glycerin" | "glycerol" => ImmersionMedium::Glycerin,
            "silicone" => ImmersionMedium::Silicone,
            _ => ImmersionMedium::Unknown(s.to_string()),
        };
        Ok(medium)
    }
}

impl From<String> for ImmersionMedium {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(medium) => medium,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for ImmersionMedium {
    fn from(s: &str) -> Self {
        ImmersionMedium::from(s.to_string())
    }
}

impl From<ImmersionMedium> for String {
    fn from(medium: ImmersionMedium) -> Self {
        medium.name().to_string()
    }
}

impl fmt::Display for ImmersionMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Refractive index for an immersion medium given by name.
///
/// Unknown names return 1.0 without error.
pub fn refractive_index(medium: &str) -> f64 {
    let index = ImmersionMedium::from(medium).refractive_index();
    debug!("Refractive index for {medium} objective: {index}");
    index
}
