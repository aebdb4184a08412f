//! Microscope and alignment settings.
//!
//! Settings are explicit values handed to the engine by argument. Image
//! metadata is advisory: [`MicroscopeSettings::resolve`] keeps the stored
//! or user-confirmed settings, fills gaps from the metadata and warns about
//! every disagreement.

use crate::error::SettingsError;
use coloc_math::ProjectorConfig;
use log::{debug, warn};
use microscope_optics::{ImmersionMedium, OpticalSystem, OpticsError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Objective and channel description of the acquisition system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroscopeSettings {
    pub objective_magnification: String,
    pub objective_na: f64,
    pub objective_immersion: String,
    /// Channel names, index 0 is channel 1
    pub channel_names: Vec<String>,
    pub emission_wavelengths_nm: Vec<f64>,
}

impl Default for MicroscopeSettings {
    fn default() -> Self {
        Self {
            objective_magnification: "5x".to_string(),
            objective_na: 1.0,
            objective_immersion: "Air".to_string(),
            channel_names: [
                "DAPI", "Alexa488", "Alexa555", "Alexa647", "Alexa730", "Alexa731", "Alexa732",
                "Alexa733",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            emission_wavelengths_nm: vec![425.0, 488.0, 555.0, 647.0, 730.0, 731.0, 732.0, 733.0],
        }
    }
}

impl MicroscopeSettings {
    /// Reject values that would make the optics degenerate.
    pub fn validate(&self) -> Result<(), OpticsError> {
        self.optical_system()?;
        for &wavelength in &self.emission_wavelengths_nm {
            if !(wavelength.is_finite() && wavelength > 0.0) {
                return Err(OpticsError::DegenerateOptics {
                    parameter: "emission wavelength",
                    value: wavelength,
                });
            }
        }
        Ok(())
    }

    pub fn optical_system(&self) -> Result<OpticalSystem, OpticsError> {
        OpticalSystem::new(
            self.objective_na,
            ImmersionMedium::from(self.objective_immersion.as_str()),
        )
    }

    /// Name and wavelength configured for a 1-based channel
    pub fn channel(&self, channel_index: u32) -> Option<ChannelDescription> {
        let i = (channel_index as usize).checked_sub(1)?;
        Some(ChannelDescription {
            name: self.channel_names.get(i)?.clone(),
            emission_wavelength_nm: *self.emission_wavelengths_nm.get(i)?,
        })
    }

    /// Effective settings for one image.
    ///
    /// These settings always win: they are the stored or user-confirmed
    /// values, command-line overrides included. Metadata only fills what
    /// they leave out, i.e. an empty magnification or the description of
    /// a channel beyond the configured list. Every field where metadata
    /// disagrees with the settings is logged as a warning.
    pub fn resolve(
        &self,
        metadata: Option<&ImageMetadata>,
        nb_channels: u32,
    ) -> MicroscopeSettings {
        let Some(meta) = metadata else {
            return self.clone();
        };

        let mismatches = self.metadata_mismatches(meta, nb_channels);
        if !mismatches.is_empty() {
            warn!(
                "Image metadata differs from the microscope settings, keeping the settings: {}",
                mismatches.join("; ")
            );
        }

        let mut resolved = self.clone();
        if resolved.objective_magnification.trim().is_empty() {
            if let Some(magnification) = &meta.objective_magnification {
                resolved.objective_magnification = magnification.clone();
            }
        }

        let n = nb_channels as usize;
        while resolved.channel_names.len() < n {
            match meta.channel_names.get(resolved.channel_names.len()) {
                Some(name) if !name.trim().is_empty() => resolved.channel_names.push(name.clone()),
                _ => break,
            }
        }
        while resolved.emission_wavelengths_nm.len() < n {
            match meta
                .emission_wavelengths_nm
                .get(resolved.emission_wavelengths_nm.len())
            {
                Some(&w) if w.is_finite() && w > 0.0 => resolved.emission_wavelengths_nm.push(w),
                _ => break,
            }
        }

        if resolved != *self {
            debug!("Filled missing channel descriptions from image metadata");
        }
        resolved
    }

    /// Describe each field where `meta` contradicts these settings.
    ///
    /// Fields missing on either side are not compared.
    pub fn metadata_mismatches(&self, meta: &ImageMetadata, nb_channels: u32) -> Vec<String> {
        let mut mismatches = Vec::new();

        if let Some(magnification) = &meta.objective_magnification {
            if !magnification
                .trim()
                .eq_ignore_ascii_case(self.objective_magnification.trim())
            {
                mismatches.push(format!(
                    "magnification {} in metadata, {} in settings",
                    magnification, self.objective_magnification
                ));
            }
        }
        if let Some(na) = meta.numerical_aperture {
            if (na - self.objective_na).abs() > 1e-9 {
                mismatches.push(format!(
                    "NA {na} in metadata, {} in settings",
                    self.objective_na
                ));
            }
        }
        if let Some(immersion) = &meta.immersion {
            let from_metadata = ImmersionMedium::from(immersion.as_str());
            let from_settings = ImmersionMedium::from(self.objective_immersion.as_str());
            if from_metadata != from_settings {
                mismatches.push(format!(
                    "immersion {from_metadata} in metadata, {from_settings} in settings"
                ));
            }
        }

        for i in 0..nb_channels as usize {
            let channel = i + 1;
            if let (Some(meta_name), Some(name)) =
                (meta.channel_names.get(i), self.channel_names.get(i))
            {
                if meta_name.trim() != name.trim() {
                    mismatches.push(format!(
                        "channel {channel} name {meta_name} in metadata, {name} in settings"
                    ));
                }
            }
            if let (Some(meta_wavelength), Some(wavelength)) = (
                meta.emission_wavelengths_nm.get(i),
                self.emission_wavelengths_nm.get(i),
            ) {
                if (meta_wavelength - wavelength).abs() > 1e-9 {
                    mismatches.push(format!(
                        "channel {channel} wavelength {meta_wavelength} nm in metadata, \
                         {wavelength} nm in settings"
                    ));
                }
            }
        }

        mismatches
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Channel name and emission wavelength
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescription {
    pub name: String,
    pub emission_wavelength_nm: f64,
}

/// Optics and channel metadata read from an image file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
    pub objective_magnification: Option<String>,
    pub numerical_aperture: Option<f64>,
    pub immersion: Option<String>,
    pub channel_names: Vec<String>,
    pub emission_wavelengths_nm: Vec<f64>,
}

/// When to skip the ellipsoid search and use spot 1 as the reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoincidencePolicy {
    /// Skip when any single coordinate is shared by both spots
    #[default]
    AnySharedAxis,
    /// Skip only when the spots are identical
    FullCoincidence,
}

impl CoincidencePolicy {
    pub fn skips_projection(&self, dx: f64, dy: f64, dz: f64) -> bool {
        match self {
            CoincidencePolicy::AnySharedAxis => dx == 0.0 || dy == 0.0 || dz == 0.0,
            CoincidencePolicy::FullCoincidence => dx == 0.0 && dy == 0.0 && dz == 0.0,
        }
    }
}

/// Engine behaviour for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub projection: ProjectorConfig,
    pub coincidence: CoincidencePolicy,
    pub include_self_pairs: bool,
    /// Compute the pairs of an image on the rayon pool
    pub parallel: bool,
    /// Also write one full table per image
    pub save_individual_files: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            projection: ProjectorConfig::default(),
            coincidence: CoincidencePolicy::default(),
            include_self_pairs: true,
            parallel: false,
            save_individual_files: false,
        }
    }
}

impl AlignmentConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
