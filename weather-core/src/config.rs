use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    model::{Coordinates, UnitSystem},
    provider::openweather::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_city = "London"
/// units = "metric"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,

    /// City fetched on startup.
    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default)]
    pub units: UnitSystem,

    /// Overrides the OpenWeather endpoint root, e.g. for a proxy.
    pub base_url: Option<String>,

    /// Position reported by "use my location" when set.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_city() -> String {
    "London".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            default_city: default_city(),
            units: UnitSystem::default(),
            base_url: None,
            latitude: None,
            longitude: None,
        }
    }
}

impl Config {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Fixed position, if both halves are configured and finite.
    pub fn fixed_position(&self) -> Option<Coordinates> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        Coordinates::new(lat, lon).ok()
    }

    /// Load config from the platform config directory, applying env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_from(&Self::config_file_path()?)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            cfg.apply_api_key_override(key);
        }
        Ok(cfg)
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn apply_api_key_override(&mut self, key: String) {
        if !key.trim().is_empty() {
            self.api_key = Some(key);
        }
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-lookup", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding persisted state such as search history.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }
}
