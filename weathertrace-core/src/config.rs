use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::model::TemperatureUnit;

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// contact_email = "me@example.com"
/// past_years_to_fetch = 10
/// past_years_to_fetch_max = 20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather One Call 3.0 key.
    pub api_key: Option<String>,

    /// Sent in the geocoding User-Agent header.
    pub contact_email: Option<String>,

    /// Replace both repositories with offline generators.
    pub dev_mode: bool,

    pub past_years_to_fetch: u32,

    /// Upper bound applied on top of `past_years_to_fetch`.
    pub past_years_to_fetch_max: u32,

    pub default_unit: TemperatureUnit,
    pub search_limit: usize,

    /// Comma-separated ISO country codes, e.g. "fr,be".
    pub country_codes: Option<String>,
    pub units: Option<String>,
    pub lang: Option<String>,

    pub weather_base_url: String,
    pub geocoding_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            contact_email: None,
            dev_mode: false,
            past_years_to_fetch: 1,
            past_years_to_fetch_max: 1,
            default_unit: TemperatureUnit::default(),
            search_limit: 5,
            country_codes: None,
            units: None,
            lang: None,
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Number of past years to request, bounded by the configured maximum.
    pub fn years_to_fetch(&self) -> u32 {
        self.past_years_to_fetch.min(self.past_years_to_fetch_max)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weathertrace", "weathertrace")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the preferences file holding favorites.
    pub fn preferences_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("preferences.json"))
    }
}
