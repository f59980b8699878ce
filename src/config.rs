//! Runtime configuration, loaded from TOML with environment overrides for the API keys.
//!
//! ```toml
//! api_key = "..."
//! deny_list = ["85"]
//! past_days = 3
//!
//! [station_endpoints]
//! "1" = "aqx_p_188"
//! "2" = "aqx_p_189"
//! ```

use crate::cache::supplementary::SupplementarySettings;
use crate::geocode::GOOGLE_GEOCODING_URL;
use crate::utils::get_cache_dir;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const MOE_API_KEY_VAR: &str = "MOE_API_KEY";
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config")]
    Parse(#[source] toml::de::Error),

    #[error("Missing API key '{0}' (set it in the config file or the environment)")]
    MissingApiKey(&'static str),

    #[error("UTC offset of {0} hours is out of range")]
    InvalidUtcOffset(i32),

    #[error("Could not determine the system cache directory")]
    CacheDirResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirboxConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub stations_endpoint: String,
    pub supplementary_endpoint: String,
    /// Station id → station-specific pollution endpoint.
    pub station_endpoints: BTreeMap<String, String>,
    /// Station ids never returned by station resolution.
    pub deny_list: Vec<String>,
    pub past_days: usize,
    pub records_per_day: usize,
    pub page_size: usize,
    pub offset_ceiling: usize,
    pub max_empty_fetches: usize,
    /// Offset of the zone upstream timestamps are written in.
    pub utc_offset_hours: i32,
    pub cache_dir: Option<PathBuf>,
    pub temperature_folder: String,
    pub humidity_folder: String,
    pub plot_dir: Option<PathBuf>,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub geocoding_url: String,
    pub geocoding_api_key: String,
}

impl Default for AirboxConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://data.moenv.gov.tw/api/v2".to_string(),
            api_key: String::new(),
            stations_endpoint: "aqx_p_07".to_string(),
            supplementary_endpoint: "aqx_p_35".to_string(),
            station_endpoints: BTreeMap::new(),
            deny_list: Vec::new(),
            past_days: 3,
            records_per_day: 24,
            page_size: 1000,
            offset_ceiling: 30_000,
            max_empty_fetches: 3,
            utc_offset_hours: 8,
            cache_dir: None,
            temperature_folder: "temperature".to_string(),
            humidity_folder: "humidity".to_string(),
            plot_dir: None,
            refresh_interval_secs: 3600,
            request_timeout_secs: 30,
            geocoding_url: GOOGLE_GEOCODING_URL.to_string(),
            geocoding_api_key: String::new(),
        }
    }
}

impl AirboxConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(ConfigError::Parse)
    }

    /// Reads a TOML file and applies the environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus the environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Replaces the API keys with `MOE_API_KEY` / `GOOGLE_API_KEY` where those are set.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(MOE_API_KEY_VAR).filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        if let Some(key) = lookup(GOOGLE_API_KEY_VAR).filter(|k| !k.is_empty()) {
            self.geocoding_api_key = key;
        }
    }

    pub fn require_api_keys(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(MOE_API_KEY_VAR));
        }
        if self.geocoding_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(GOOGLE_API_KEY_VAR));
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidUtcOffset(self.utc_offset_hours))
    }

    pub fn window_hours(&self) -> i64 {
        i64::try_from(self.past_days * 24).unwrap_or(i64::MAX)
    }

    /// Pollution records wanted for one station.
    pub fn pollution_target(&self) -> usize {
        self.records_per_day * self.past_days
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn resolved_cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_cache_dir().ok_or(ConfigError::CacheDirResolution),
        }
    }

    pub fn resolved_plot_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.plot_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.resolved_cache_dir()?.join("plots")),
        }
    }

    /// Settings of the shared temperature/humidity refresh, sized for every mapped station.
    pub fn supplementary_settings(&self) -> SupplementarySettings {
        SupplementarySettings {
            endpoint: self.supplementary_endpoint.clone(),
            station_count: self.station_endpoints.len(),
            records_per_day: self.records_per_day,
            past_days: self.past_days,
            page_size: self.page_size,
            temperature_folder: self.temperature_folder.clone(),
            humidity_folder: self.humidity_folder.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = AirboxConfig::from_toml_str("").unwrap();
        assert_eq!(config, AirboxConfig::default());
        assert_eq!(config.window_hours(), 72);
        assert_eq!(config.pollution_target(), 72);
        assert_eq!(config.zone().unwrap().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn parses_station_table_and_overrides() {
        let config = AirboxConfig::from_toml_str(
            r#"
            api_key = "moe"
            deny_list = ["85", "86"]
            past_days = 2
            cache_dir = "/tmp/airbox"

            [station_endpoints]
            "1" = "aqx_p_188"
            "12" = "aqx_p_199"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_key, "moe");
        assert_eq!(config.deny_list, vec!["85", "86"]);
        assert_eq!(config.station_endpoints["12"], "aqx_p_199");
        assert_eq!(config.resolved_plot_dir().unwrap(), PathBuf::from("/tmp/airbox/plots"));

        let settings = config.supplementary_settings();
        assert_eq!(settings.station_count, 2);
        assert_eq!(settings.target_count(), 24 * 2 * 2);
        assert_eq!(settings.window_hours(), 48);
    }

    #[test]
    fn rejects_wrong_types() {
        let err = AirboxConfig::from_toml_str("past_days = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_overrides_keys() {
        let mut config = AirboxConfig {
            api_key: "from-file".to_string(),
            ..Default::default()
        };
        config.apply_overrides(|name| match name {
            GOOGLE_API_KEY_VAR => Some("google".to_string()),
            MOE_API_KEY_VAR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.geocoding_api_key, "google");
        assert!(config.require_api_keys().is_ok());
    }

    #[test]
    fn missing_keys_are_named() {
        let config = AirboxConfig {
            geocoding_api_key: "google".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.require_api_keys(),
            Err(ConfigError::MissingApiKey(MOE_API_KEY_VAR))
        ));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let config = AirboxConfig {
            utc_offset_hours: 30,
            ..Default::default()
        };
        assert!(matches!(config.zone(), Err(ConfigError::InvalidUtcOffset(30))));
    }
}
