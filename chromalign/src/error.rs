//! Error types for channel registration, inputs, settings and reports.

use coloc_math::ProjectionError;
use microscope_optics::OpticsError;
use thiserror::Error;

/// Errors raised while computing registration metrics
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error(transparent)]
    Optics(#[from] OpticsError),
    #[error("tolerance ellipsoid: {0}")]
    Ellipsoid(#[from] ProjectionError),
    #[error("channel index must be 1 or greater, got {0}")]
    InvalidChannelIndex(u32),
    #[error("channel {channel} spot position is not finite")]
    NonFinitePosition { channel: u32 },
    #[error("channel {0} appears more than once")]
    DuplicateChannel(u32),
    #[error("image has no channel spots")]
    EmptyImage,
}

/// Errors raised while loading or interpreting a measurement file
#[derive(Error, Debug)]
pub enum MeasurementError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed measurement file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image declares no channels")]
    NoChannels,
    #[error("channel {channel} has no detected spot")]
    MissingSpot { channel: u32 },
    #[error("channel {channel} has {count} detected spots, expected exactly one")]
    MultipleSpots { channel: u32, count: usize },
    #[error("spot refers to channel {channel} but the image has {nb_channels} channels")]
    UnknownChannel { channel: u32, nb_channels: u32 },
    #[error("no emission wavelength configured for channel {channel}")]
    MissingWavelength { channel: u32 },
    #[error(transparent)]
    Optics(#[from] OpticsError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Errors raised while loading, saving or validating settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Optics(#[from] OpticsError),
}

/// Errors raised while writing result tables
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
