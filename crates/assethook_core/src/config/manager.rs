//! On-disk home of the engine [`Settings`].
//!
//! Saves never leave a half-written file behind: the TOML is written next
//! to the target and renamed over it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::settings::Settings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No settings file at {}", .0.display())]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings bound to a TOML file.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Start with built-in defaults; nothing is read until a load.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory edits; persisted by [`save`](Self::save).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Replace the in-memory settings with the file's contents.
    ///
    /// Keys absent from the file take their defaults.
    pub fn load(&mut self) -> ConfigResult<()> {
        let content = fs::read_to_string(&self.config_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(self.config_path.clone()),
            _ => ConfigError::Io(e),
        })?;
        self.settings = toml::from_str(&content)?;
        tracing::debug!("Settings read from {}", self.config_path.display());
        Ok(())
    }

    /// Like [`load`](Self::load), but a missing file is written out with
    /// defaults first.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            return self.load();
        }

        tracing::info!("No settings at {}, writing defaults", self.config_path.display());
        self.settings = Settings::default();
        self.save()
    }

    pub fn save(&self) -> ConfigResult<()> {
        let content = self.render()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    fn render(&self) -> ConfigResult<String> {
        let mut output = String::new();
        output.push_str("# AssetHook validation engine configuration\n");
        output.push_str("# Missing keys fall back to built-in defaults.\n\n");
        output.push_str(&toml::to_string_pretty(&self.settings)?);
        Ok(output)
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Same directory as the target so the rename stays on one filesystem
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}
