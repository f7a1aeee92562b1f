//! Optional `islands.toml` with file locations and the log timestamp format.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::logfile::DEFAULT_EXPORT_FILE;
use crate::transfer::DEFAULT_TIMESTAMP_FORMAT;

pub const DEFAULT_CONFIG_FILE: &str = "islands.toml";

/// Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// JSON document holding the persisted keys.
    pub store_path: PathBuf,

    /// Where `export-log` writes when no `--out` is given.
    pub export_path: PathBuf,

    /// `chrono` strftime pattern used for log entry timestamps.
    pub timestamp_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("islands.json"),
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(anyhow!("store_path must not be empty"));
        }
        if self.export_path.as_os_str().is_empty() {
            return Err(anyhow!("export_path must not be empty"));
        }
        if self.timestamp_format.trim().is_empty() {
            return Err(anyhow!("timestamp_format must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file; a missing file yields `Config::default()`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
