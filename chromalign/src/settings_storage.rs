//! Persistent storage for microscope and alignment settings.
//!
//! Settings are stored as JSON under ~/.chromalign/ by default.

use crate::error::SettingsError;
use crate::settings::{AlignmentConfig, MicroscopeSettings};
use std::path::{Path, PathBuf};

const MICROSCOPE_SETTINGS_FILE: &str = "microscope_settings.json";
const ALIGNMENT_CONFIG_FILE: &str = "alignment_config.json";

/// Settings storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct SettingsStorage {
    root_path: PathBuf,
}

impl SettingsStorage {
    /// Storage at ~/.chromalign
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self {
            root_path: PathBuf::from(home).join(".chromalign"),
        })
    }

    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn microscope_settings_path(&self) -> PathBuf {
        self.root_path.join(MICROSCOPE_SETTINGS_FILE)
    }

    fn alignment_config_path(&self) -> PathBuf {
        self.root_path.join(ALIGNMENT_CONFIG_FILE)
    }

    /// Stored microscope settings.
    ///
    /// Returns None if nothing was saved yet.
    /// Returns Some(Err) if the file exists but cannot be loaded.
    pub fn get_microscope_settings(&self) -> Option<Result<MicroscopeSettings, SettingsError>> {
        let path = self.microscope_settings_path();
        if !path.exists() {
            return None;
        }
        Some(MicroscopeSettings::load_from_file(&path))
    }

    /// Stored settings, or the defaults when none were saved.
    pub fn microscope_settings_or_default(&self) -> Result<MicroscopeSettings, SettingsError> {
        self.get_microscope_settings()
            .unwrap_or_else(|| Ok(MicroscopeSettings::default()))
    }

    pub fn save_microscope_settings(
        &self,
        settings: &MicroscopeSettings,
    ) -> Result<PathBuf, SettingsError> {
        settings.validate()?;
        std::fs::create_dir_all(&self.root_path)?;

        let path = self.microscope_settings_path();
        settings.save_to_file(&path)?;
        Ok(path)
    }

    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete_microscope_settings(&self) -> std::io::Result<bool> {
        remove_if_exists(&self.microscope_settings_path())
    }

    pub fn get_alignment_config(&self) -> Option<Result<AlignmentConfig, SettingsError>> {
        let path = self.alignment_config_path();
        if !path.exists() {
            return None;
        }
        Some(AlignmentConfig::load_from_file(&path))
    }

    pub fn alignment_config_or_default(&self) -> Result<AlignmentConfig, SettingsError> {
        self.get_alignment_config()
            .unwrap_or_else(|| Ok(AlignmentConfig::default()))
    }

    pub fn save_alignment_config(
        &self,
        config: &AlignmentConfig,
    ) -> Result<PathBuf, SettingsError> {
        std::fs::create_dir_all(&self.root_path)?;

        let path = self.alignment_config_path();
        config.save_to_file(&path)?;
        Ok(path)
    }

    pub fn delete_alignment_config(&self) -> std::io::Result<bool> {
        remove_if_exists(&self.alignment_config_path())
    }
}

impl Default for SettingsStorage {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_path(PathBuf::from(".chromalign")))
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}
