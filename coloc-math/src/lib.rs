//! coloc-math - Geometry for multi-channel spot colocalization
//!
//! This crate provides the geometric building blocks used to compare the
//! positions of one fiducial bead as seen in several fluorescence channels:
//!
//! - **Distances** - lateral, oriented axial and 3D separation of two spots
//! - **Ellipsoid projection** - where the spot1 -> spot2 line crosses a
//!   resolution-sized tolerance ellipsoid centered on spot1
//!
//! # Example
//!
//! ```
//! use coloc_math::{euclidean_distance, project_on_ellipsoid, ProjectorConfig, ToleranceEllipsoid};
//! use nalgebra::Point3;
//!
//! let spot1 = Point3::new(0.0, 0.0, 0.0);
//! let spot2 = Point3::new(0.3, 0.4, 0.0);
//!
//! let d = euclidean_distance(&spot1, &spot2);
//! assert!((d.lateral - 0.5).abs() < 1e-12);
//!
//! let ellipsoid = ToleranceEllipsoid::new(spot1, 0.25, 0.6).unwrap();
//! let proj = project_on_ellipsoid(&ellipsoid, &spot2, &ProjectorConfig::default()).unwrap();
//! assert!((ellipsoid.ratio(&proj.point) - 1.0).abs() < 1e-9);
//! ```

pub mod distance;
pub mod ellipsoid;

pub use distance::{euclidean_distance, Distances};
pub use ellipsoid::{
    point_on_line, project_on_ellipsoid, Projection, ProjectionError, ProjectorConfig,
    SearchMethod, ToleranceEllipsoid,
};
