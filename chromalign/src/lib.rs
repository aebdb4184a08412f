//! chromalign - Chromatic shift quality control for fluorescence microscopes
//!
//! Given one fiducial bead imaged in several channels, this crate measures
//! how far each channel's localization of the bead is displaced from every
//! other channel, and compares that shift with the diffraction-limited
//! resolution of the system:
//!
//! - **Measurements** - JSON hand-off from spot detection, one spot per channel
//! - **Settings** - objective and channel descriptions, metadata precedence
//! - **Pair metrics** - shifts, distances, tolerance ellipsoid and
//!   colocalization ratios for one ordered channel pair
//! - **Engine** - every ordered pair of every image
//! - **Reports** - full and essential CSV tables
//!
//! # Example
//!
//! ```
//! use chromalign::{AlignmentInput, ChannelAlignmentEngine, ChannelSpot, ImageCalibration};
//! use microscope_optics::{ImmersionMedium, OpticalSystem, SpaceUnit, VoxelSize};
//! use nalgebra::Point3;
//!
//! let input = AlignmentInput {
//!     image_name: "beads".to_string(),
//!     filename: "beads.czi".to_string(),
//!     spots: vec![
//!         ChannelSpot::new(1, "GFP", 510.0, Point3::new(1.0, 1.0, 2.0), 50.0).unwrap(),
//!         ChannelSpot::new(2, "mCherry", 610.0, Point3::new(1.03, 0.98, 2.2), 45.0).unwrap(),
//!     ],
//!     calibration: ImageCalibration::new(
//!         VoxelSize::new(0.1, 0.1, 0.3).unwrap(),
//!         SpaceUnit::Micrometer,
//!         "sec",
//!     ),
//!     optics: OpticalSystem::new(1.4, ImmersionMedium::Oil).unwrap(),
//! };
//!
//! let result = ChannelAlignmentEngine::default().align_image(&input).unwrap();
//! assert_eq!(result.rows.len(), 4);
//! assert!(result.pair(1, 2).unwrap().colocalization_ratio_3d.is_some());
//! ```

pub mod engine;
pub mod error;
pub mod measurement;
pub mod model;
pub mod pair;
pub mod report;
pub mod settings;
pub mod settings_storage;

pub use engine::{AlignmentInput, ChannelAlignmentEngine};
pub use error::{MeasurementError, RegistrationError, ReportError, SettingsError};
pub use measurement::{CalibrationRecord, DetectedSpot, ImageMeasurement};
pub use model::{
    ChannelPairMetrics, ChannelSpot, ImageAlignment, ImageCalibration, PairFailure, ReferencePoint,
};
pub use pair::compute_pair_metrics;
pub use report::{ReportWriter, write_essential_table, write_full_table};
pub use settings::{AlignmentConfig, CoincidencePolicy, ImageMetadata, MicroscopeSettings};
pub use settings_storage::SettingsStorage;
