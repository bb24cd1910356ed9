use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PGE_BASE_URL: &str = "https://www.paraglidingearth.com/api/geojson";
pub const DEFAULT_PGE_SEARCH_URL: &str =
    "https://paraglidingearth.com/assets/ajax/searchSitesJSON.php";
pub const DEFAULT_NWS_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "ParaglideLog/0.3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quiet period after the last viewport change before loading
    pub debounce_ms: u64,
    /// Minimum edge movement in degrees that counts as a new viewport
    pub bounds_threshold: f64,
    /// Maximum remote sites requested per viewport
    pub remote_page_size: u32,
    pub remote_timeout_secs: u64,
    pub remote_base_url: String,
    pub pge_search_url: String,
    pub nws_base_url: String,
    /// Radius for weather station lookups around a site
    pub station_radius_km: f64,
    pub user_agent: String,
    /// Local site store location; defaults to `sites.json` in the config root
    pub store_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            bounds_threshold: 1e-3,
            remote_page_size: 50,
            remote_timeout_secs: 10,
            remote_base_url: DEFAULT_PGE_BASE_URL.to_string(),
            pge_search_url: DEFAULT_PGE_SEARCH_URL.to_string(),
            nws_base_url: DEFAULT_NWS_BASE_URL.to_string(),
            station_radius_km: crate::geo::DEFAULT_SEARCH_RADIUS_KM,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            store_path: None,
        }
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn store_path_in(&self, config_root: &Path) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| config_root.join("sites.json"))
    }
}

#[derive(Debug, Clone)]
pub struct SettingsManager {
    config_root: PathBuf,
    config_path: PathBuf,
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new(crate::get_config_root())
    }
}

impl SettingsManager {
    pub fn new<P: Into<PathBuf>>(config_root: P) -> Self {
        let config_root = config_root.into();
        let config_path = config_root.join("settings.json");
        Self {
            config_root,
            config_path,
        }
    }

    pub fn config_root(&self) -> &Path {
        &self.config_root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<Settings> {
        if !self.config_path.exists() {
            log::debug!(
                "No settings file; using defaults — config_path={}",
                self.config_path.display()
            );
            return Ok(Settings::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read settings.json")?;

        serde_json::from_str(&content).context("Failed to parse settings.json")
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        fs::write(&self.config_path, content).context("Failed to write settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::new(dir.path());
        let settings = manager.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.debounce(), Duration::from_millis(500));
        assert_eq!(
            settings.store_path_in(manager.config_root()),
            dir.path().join("sites.json")
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("settings.json"),
            r#"{ "debounce_ms": 250, "remote_page_size": 20 }"#,
        )
        .unwrap();

        let settings = SettingsManager::new(dir.path()).load().unwrap();
        assert_eq!(settings.debounce_ms, 250);
        assert_eq!(settings.remote_page_size, 20);
        assert_eq!(settings.remote_timeout_secs, 10);
        assert_eq!(settings.remote_base_url, DEFAULT_PGE_BASE_URL);
        assert_eq!(settings.nws_base_url, DEFAULT_NWS_BASE_URL);
        assert_eq!(settings.station_radius_km, 50.0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), "{ nope").unwrap();
        let err = SettingsManager::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("settings.json"));
    }
}
