use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Runtime settings, usually read from `quire.toml`. Missing keys take their
/// defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuireConfig {
    /// The redb database file.
    pub database_file: PathBuf,
    /// Directory holding blob bytes, one file per blob.
    pub blob_root: PathBuf,
    /// Items returned per listing call.
    pub page_size: usize,
    /// Title given to the site at provisioning.
    pub site_title: String,
    pub log_level: String,
}

impl Default for QuireConfig {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from("quire.redb"),
            blob_root: PathBuf::from("quire-content"),
            page_size: 50,
            site_title: "New Site".into(),
            log_level: "info".into(),
        }
    }
}

impl QuireConfig {
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        if config.page_size == 0 {
            return Err(SdkError::Config("page_size must be at least 1".into()));
        }
        Ok(config)
    }

    /// Resolve relative paths against `base`, typically the config file's
    /// directory.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.database_file.is_relative() {
            self.database_file = base.join(&self.database_file);
        }
        if self.blob_root.is_relative() {
            self.blob_root = base.join(&self.blob_root);
        }
        self
    }
}
