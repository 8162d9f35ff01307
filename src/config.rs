// src/config.rs
//! Configuration file parsing for the worker
//!
//! Supports TOML configuration files with the following sections:
//! - [worker] - Lock timeout and path, architecture, output format, logging
//! - [index] - Package listing, installed-package source, install-only list
//!
//! Every field has a default. Command-line flags override file values.

use crate::error::{Error, Result};
use crate::lock::LockManager;
use crate::protocol::OutputFormat;
use crate::version::native_arch;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerConfig {
    /// Worker settings
    #[serde(default)]
    pub worker: WorkerSection,

    /// Package index settings
    #[serde(default)]
    pub index: IndexConfig,
}

/// Worker configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSection {
    /// Seconds to wait for the package database lock
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout: u64,

    /// Lock file guarding the package database
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,

    /// Native architecture override (detected when unset)
    #[serde(default)]
    pub arch: Option<String>,

    /// Response encoding: "text" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            lock_timeout: default_lock_timeout(),
            lock_path: default_lock_path(),
            arch: None,
            output: default_output(),
            log_level: default_log_level(),
        }
    }
}

fn default_lock_timeout() -> u64 {
    30
}

fn default_lock_path() -> PathBuf {
    PathBuf::from(LockManager::DEFAULT_PATH)
}

fn default_output() -> String {
    "text".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Where the installed package set comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstalledSource {
    /// The system rpm database
    #[default]
    Rpmdb,
    /// The `i` and `r` records of the package listing
    Snapshot,
}

/// Package index configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Package listing with available (and optionally installed) records
    #[serde(default)]
    pub snapshot: Option<PathBuf>,

    #[serde(default)]
    pub installed_source: InstalledSource,

    /// rpm binary used for the installed set
    #[serde(default = "default_rpm_command")]
    pub rpm_command: String,

    /// Install-only names, replacing the listing's and the built-in list
    #[serde(default)]
    pub install_only: Option<Vec<String>>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            snapshot: None,
            installed_source: InstalledSource::default(),
            rpm_command: default_rpm_command(),
            install_only: None,
        }
    }
}

fn default_rpm_command() -> String {
    "rpm".to_string()
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub lock_timeout: Option<u64>,
    pub lock_path: Option<PathBuf>,
    pub arch: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub installed_source: Option<InstalledSource>,
    pub json: bool,
}

impl WorkerConfig {
    /// Load configuration from a TOML file
    ///
    /// The result is not validated here since command-line overrides may
    /// still complete it; call [`WorkerConfig::validate`] once they are in.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: WorkerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply command-line overrides on top of file values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(timeout) = overrides.lock_timeout {
            self.worker.lock_timeout = timeout;
        }
        if let Some(path) = &overrides.lock_path {
            self.worker.lock_path = path.clone();
        }
        if let Some(arch) = &overrides.arch {
            self.worker.arch = Some(arch.clone());
        }
        if let Some(snapshot) = &overrides.snapshot {
            self.index.snapshot = Some(snapshot.clone());
        }
        if let Some(source) = overrides.installed_source {
            self.index.installed_source = source;
        }
        if overrides.json {
            self.worker.output = OutputFormat::Json.to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker.lock_timeout == 0 {
            return Err(Error::ConfigError(
                "worker.lock_timeout must be at least 1 second".to_string(),
            ));
        }

        self.output_format()?;

        if self.index.installed_source == InstalledSource::Snapshot && self.index.snapshot.is_none()
        {
            return Err(Error::ConfigError(
                "index.installed_source = \"snapshot\" requires index.snapshot".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.lock_timeout)
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.worker.output.parse().map_err(|_| {
            Error::ConfigError(format!(
                "worker.output must be \"text\" or \"json\", got \"{}\"",
                self.worker.output
            ))
        })
    }

    /// Configured architecture, or the detected one
    pub fn native_arch(&self) -> String {
        self.worker.arch.clone().unwrap_or_else(native_arch)
    }
}
