use crate::categories::browser::BROWSER_PROCESSES;
use crate::cleaner::DEFAULT_ENTRY_WORKERS;
use directories::ProjectDirs;
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "TEMPSWEEP_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid exclusion pattern: {0}")]
    Exclusion(#[from] globset::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub browsers: BrowserSettings,

    #[serde(default)]
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Concurrent entries per directory.
    #[serde(default = "default_entry_workers")]
    pub entry_workers: usize,

    /// Concurrent categories; 0 means one per CPU.
    #[serde(default)]
    pub category_workers: usize,

    /// Wait after closing browsers, in milliseconds.
    #[serde(default = "default_browser_grace_ms")]
    pub browser_grace_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_browser_processes")]
    pub process_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            entry_workers: default_entry_workers(),
            category_workers: 0,
            browser_grace_ms: default_browser_grace_ms(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            process_names: default_browser_processes(),
        }
    }
}

fn default_entry_workers() -> usize { DEFAULT_ENTRY_WORKERS }
fn default_browser_grace_ms() -> u64 { 1500 }
fn default_browser_processes() -> Vec<String> {
    BROWSER_PROCESSES.iter().map(|name| name.to_string()).collect()
}

impl Config {
    /// `$TEMPSWEEP_CONFIG`, else `<config dir>/tempsweep/config.toml`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "tempsweep").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load config from file or return defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => config,
                Err(err) => {
                    warn!(error = %err, "using default configuration");
                    Self::default()
                }
            },
            Ok(_) => Self::default(),
            Err(err) => {
                warn!(error = %err, "using default configuration");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply CLI option overrides
    pub fn apply_cli_overrides(
        &mut self,
        entry_workers: Option<usize>,
        extra_exclusions: &[String],
    ) {
        if let Some(workers) = entry_workers {
            self.engine.entry_workers = workers.max(1);
        }
        for pattern in extra_exclusions {
            if !self.exclusions.patterns.contains(pattern) {
                self.exclusions.patterns.push(pattern.clone());
            }
        }
    }

    pub fn exclusion_set(&self) -> Result<GlobSet, ConfigError> {
        Ok(crate::targets::exclusion_set(&self.exclusions.patterns)?)
    }
}
