pub mod config;
pub mod coverage;
pub mod geo;
pub mod loader;
pub mod remote;
pub mod sites;
pub mod stations;
pub mod store;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("API error: {0}")]
    Api(String),
    #[error("{0} refused the request (HTTP 403)")]
    Forbidden(String),
    #[error("Unsupported site store version {found} (expected {expected})")]
    StoreVersion { found: u32, expected: u32 },
}

/// Failure of one or both legs of a dual-source fetch.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", self.describe())]
pub struct LoadError {
    pub local: Option<String>,
    pub remote: Option<String>,
}

impl LoadError {
    fn describe(&self) -> String {
        match (&self.local, &self.remote) {
            (Some(l), Some(r)) => format!("Failed to load sites (local: {}; remote: {})", l, r),
            (Some(l), None) => format!("Failed to load local sites: {}", l),
            (None, Some(r)) => format!("Failed to load nearby sites: {}", r),
            (None, None) => "Failed to load sites".to_string(),
        }
    }
}

/// Per-user configuration directory. `PARAGLIDE_CONFIG_DIR` overrides the platform default.
pub fn get_config_root() -> PathBuf {
    if let Some(dir) = std::env::var_os("PARAGLIDE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("org", "paraglide", "ParaglideLog")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".paraglide"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_message() {
        let err = LoadError {
            local: None,
            remote: Some("Request timed out after 10s".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load nearby sites: Request timed out after 10s"
        );

        let both = LoadError {
            local: Some("disk".to_string()),
            remote: Some("503".to_string()),
        };
        assert!(both.to_string().contains("local: disk"));
        assert!(both.to_string().contains("remote: 503"));
    }
}
