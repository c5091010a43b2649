use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::Settings;
use crate::tui::theme::ThemeVariant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model files; relative entries are resolved against the config file's directory
    #[serde(default)]
    pub input_files: Vec<PathBuf>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_zoom_step")]
    pub zoom_step: u32,
    #[serde(default)]
    pub theme: ThemeVariant,
}

fn default_zoom_step() -> u32 {
    5
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            zoom_step: default_zoom_step(),
            theme: ThemeVariant::default(),
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("fault-explorer");
        Ok(config_dir.join("config.toml"))
    }

    /// Loads the default config file; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            info!("Config file {:?} doesn't exist, using defaults", config_path);
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Loads an explicit config file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.input_files = config
            .input_files
            .into_iter()
            .map(|file| if file.is_relative() { base.join(file) } else { file })
            .collect();
        if config.settings.importance {
            config.settings.probability = true;
        }

        debug!("Loaded config with {} input file(s)", config.input_files.len());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", path);
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty() && !dir.exists()) {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create config directory: {:?}", dir))?;
            info!("Created config directory: {:?}", dir);
        }

        let config_content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, config_content).with_context(|| format!("Failed to write config file: {:?}", path))?;

        info!("Config saved successfully");
        Ok(())
    }
}
