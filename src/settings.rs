//! Settings management
//!
//! Stores user preferences in ~/.config/astc-converter/settings.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::encoder::Quality;
use crate::pipeline::ConvertConfig;
use crate::textures::BlockChoice;

/// User settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Folder scanned for images
    #[serde(default)]
    pub input_folder: String,

    /// Path to the astcenc executable
    #[serde(default)]
    pub encoder_path: String,

    /// `auto` or `{bx}x{by}`
    #[serde(default = "default_block_size")]
    pub block_size: String,

    /// Encoder quality token
    #[serde(default = "default_quality")]
    pub quality: String,
}

fn default_block_size() -> String {
    "auto".to_string()
}

fn default_quality() -> String {
    Quality::default().token().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_folder: String::new(),
            encoder_path: String::new(),
            block_size: default_block_size(),
            quality: default_quality(),
        }
    }
}

impl Settings {
    /// Get the config directory path (~/.config/astc-converter)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("astc-converter");

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let loaded = Self::settings_path().and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Could not load settings: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    /// Save to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Parsed block size setting
    pub fn block_choice(&self) -> Result<BlockChoice> {
        self.block_size
            .parse()
            .with_context(|| format!("Invalid block_size in settings: {:?}", self.block_size))
    }

    /// Parsed quality setting
    pub fn quality(&self) -> Result<Quality> {
        self.quality
            .parse()
            .with_context(|| format!("Invalid quality in settings: {:?}", self.quality))
    }

    /// Explicit run configuration built from these settings
    pub fn to_convert_config(&self) -> Result<ConvertConfig> {
        let mut config = ConvertConfig::new(&self.input_folder, &self.encoder_path);
        config.block = self.block_choice()?;
        config.quality = self.quality()?;
        Ok(config)
    }
}
