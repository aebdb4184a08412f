//! Microscope optics for registration quality control
//!
//! This crate provides the diffraction and sampling figures needed to
//! judge whether a measured shift between fluorescence channels is
//! optically significant:
//!
//! - **Immersion media** - refractive index lookup with a silent 1.0 fallback
//! - **Space units** - normalization of calibration units and wavelength conversion
//! - **Objectives** - numerical aperture / medium pairs and common presets
//! - **Nyquist sampling** - ideal pixel sizes and undersampling ratios
//! - **Resolution** - theoretical and undersampling-adjusted resolution
//!
//! # Example
//!
//! ```rust
//! use microscope_optics::{
//!     ImmersionMedium, OpticalSystem, ResolutionProfile, SpaceUnit, VoxelSize,
//! };
//!
//! let optics = OpticalSystem::new(1.4, ImmersionMedium::Oil).unwrap();
//! let voxel = VoxelSize::isotropic(0.1).unwrap();
//! let wavelength = SpaceUnit::Micrometer.from_nanometers(510.0);
//!
//! let profile = ResolutionProfile::compute(wavelength, &optics, &voxel).unwrap();
//! assert!(profile.nyquist_ratio_lateral > 1.0);
//! assert!(profile.resolution_lateral_practical > profile.resolution_lateral_theoretical);
//! ```

pub mod error;
pub mod immersion;
pub mod nyquist;
pub mod objective;
pub mod profile;
pub mod resolution;
pub mod units;

pub use error::OpticsError;
pub use immersion::{refractive_index, ImmersionMedium};
pub use nyquist::{nyquist_sampling, NyquistSampling};
pub use objective::{half_aperture_angle, ObjectiveModel, OpticalSystem};
pub use profile::ResolutionProfile;
pub use resolution::{diffraction_limit, DiffractionLimit};
pub use units::{SpaceUnit, VoxelSize};
