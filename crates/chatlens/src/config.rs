//! Project configuration file support for chatlens.
//!
//! Loads configuration from `chatlens.toml` in the working directory. None
//! of these knobs affect engine correctness; they are policy values passed
//! into the operations.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "chatlens.toml";

const DEFAULT_MAX_RECENT: usize = 50;

/// Configuration loaded from `chatlens.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ChatlensConfig {
    /// Storage root override (CLI flag wins over this)
    pub root: Option<PathBuf>,
    /// Maximum entries shown by recent listings
    pub max_recent: Option<usize>,
    /// Ask before overwriting files on export
    pub confirm_destructive: Option<bool>,
}

impl ChatlensConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ChatlensConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn max_recent(&self) -> usize {
        self.max_recent.unwrap_or(DEFAULT_MAX_RECENT)
    }

    pub fn confirm_destructive(&self) -> bool {
        self.confirm_destructive.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ChatlensConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn parses_all_knobs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "root = \"/tmp/storage\"\nmax_recent = 10\nconfirm_destructive = true\n",
        )
        .unwrap();

        let config = ChatlensConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.root.as_deref(), Some(Path::new("/tmp/storage")));
        assert_eq!(config.max_recent(), 10);
        assert!(config.confirm_destructive());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "surprise = 1\n").unwrap();
        assert!(ChatlensConfig::load(dir.path()).is_err());
    }
}
