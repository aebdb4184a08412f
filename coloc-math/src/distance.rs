//! Lateral, axial and 3D separation between two localized spots.
//!
//! The lateral and 3D components are unsigned. The axial component keeps
//! its sign (`z2 - z1`) so that a focal offset between two channels can be
//! told apart from its mirror image.

use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Separation between two points, split into the components used by
/// colocalization analysis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distances {
    /// In-plane distance, `sqrt(dx² + dy²)`
    pub lateral: f64,
    /// Oriented focal distance, `z2 - z1`
    pub axial: f64,
    /// Full Euclidean distance, `sqrt(dx² + dy² + dz²)`
    pub distance_3d: f64,
}

impl Distances {
    /// True when all three components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.lateral == 0.0 && self.axial == 0.0 && self.distance_3d == 0.0
    }
}

/// Compute the lateral, axial and 3D distance from `p1` to `p2`.
///
/// Swapping the arguments leaves `lateral` and `distance_3d` unchanged
/// and negates `axial`.
pub fn euclidean_distance(p1: &Point3<f64>, p2: &Point3<f64>) -> Distances {
    let delta = p2 - p1;
    let lateral = (delta.x * delta.x + delta.y * delta.y).sqrt();
    let axial = delta.z;
    let distance_3d = delta.norm();

    debug!(
        "Distances from ({}, {}, {}) to ({}, {}, {}): \
         lateral={lateral}, axial={axial}, 3d={distance_3d}",
        p1.x, p1.y, p1.z, p2.x, p2.y, p2.z
    );

    Distances {
        lateral,
        axial,
        distance_3d,
    }
}
