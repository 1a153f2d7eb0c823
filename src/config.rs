// Runtime configuration: where the credential file lives, which folder
// to operate on and how to reach the backend. Loaded once at process
// start from an optional JSON file, with command-line/environment
// values layered on top.

use crate::error::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Validated configuration handed to session construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub credentials_path: PathBuf,
    pub folder_id: String,
    pub api_base: String,
    pub upload_base: String,
    /// `None` leaves requests without a deadline.
    pub timeout: Option<Duration>,
}

/// Partial configuration. Used both for the JSON file and for values
/// coming from flags or environment variables.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub credentials_path: Option<PathBuf>,
    pub folder_id: Option<String>,
    pub api_base: Option<String>,
    pub upload_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigLayer {
    /// Values set in `other` win over the ones in `self`.
    pub fn merge(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            credentials_path: other.credentials_path.or(self.credentials_path),
            folder_id: other.folder_id.or(self.folder_id),
            api_base: other.api_base.or(self.api_base),
            upload_base: other.upload_base.or(self.upload_base),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn into_config(self) -> Result<Config, Error> {
        let credentials_path = self
            .credentials_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::Config("no credential file configured".into()))?;
        let folder_id = self
            .folder_id
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| Error::Config("no target folder id configured".into()))?;
        Ok(Config {
            credentials_path,
            folder_id,
            api_base: trim_base(self.api_base, DEFAULT_API_BASE),
            upload_base: trim_base(self.upload_base, DEFAULT_UPLOAD_BASE),
            timeout: self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        })
    }
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Location of the per-user config file, e.g. `~/.config/drivefolder/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("drivefolder").join("config.json"))
}

impl Config {
    /// Load configuration. An explicitly given file must exist; the
    /// default per-user file is optional.
    pub fn load(explicit_file: Option<&Path>, overrides: ConfigLayer) -> Result<Self, Error> {
        let base = match explicit_file {
            Some(path) => ConfigLayer::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => ConfigLayer::from_file(&path)?,
                _ => ConfigLayer::default(),
            },
        };
        let config = base.merge(overrides).into_config()?;
        tracing::debug!(
            folder_id = %config.folder_id,
            credentials = %config.credentials_path.display(),
            timeout = ?config.timeout,
            "configuration loaded"
        );
        Ok(config)
    }
}
