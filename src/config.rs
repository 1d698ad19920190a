use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::ProcessOptions;

/// Top-level configuration for datetaken.
///
/// Every section falls back to its defaults when missing, so a config file
/// only needs the values it changes.
///
/// # Loading
///
/// ```rust,no_run
/// use datetaken::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.timestamps.sync_file_times = false;
/// config.output.backup_originals = true;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem timestamp handling.
    pub timestamps: TimestampConfig,
    /// Batch behavior (strict mode, directory recursion).
    pub batch: BatchConfig,
    /// Output behavior (dry run, backups, decorated records).
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    /// Set file modified/accessed (and, where possible, created) times to the new date.
    pub sync_file_times: bool,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            sync_file_times: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Stop after the first file that fails.
    pub stop_on_first_failure: bool,
    /// Descend into subdirectories of directory arguments.
    pub recursive: bool,
}

/// Output behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Compute and report new dates without writing any file.
    pub dry_run: bool,
    /// Create `.bak` copies before overwriting.
    pub backup_originals: bool,
    /// Print a JSON record (path, old and new date) per changed file.
    pub decorate: bool,
}

impl Config {
    /// Resolve the config file path: same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::log!(
                missing_file_level(path.is_some()),
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        log::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Per-file processing options for this config.
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            preview: self.output.dry_run,
            sync_file_times: self.timestamps.sync_file_times,
            backup_originals: self.output.backup_originals,
            stop_on_first_failure: self.batch.stop_on_first_failure,
            recursive: self.batch.recursive,
        }
    }
}

/// A config file passed explicitly is expected to exist; the default one
/// next to the executable usually does not.
fn missing_file_level(explicit: bool) -> log::Level {
    if explicit {
        log::Level::Warn
    } else {
        log::Level::Debug
    }
}
