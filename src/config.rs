//! Configuration management
//!
//! This module handles loading and managing configuration from:
//! - Command-line arguments
//! - Configuration files (TOML)
//! - Defaults

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultConfig,

    #[serde(default)]
    pub unfold: UnfoldConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultConfig {
    /// Output format when none is given on the command line
    #[serde(default = "default_output")]
    pub output: String,
}

/// How the processes of a model are combined before unfolding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Composition {
    /// Channel system: asynchronous steps plus rendezvous on channels
    #[default]
    Channel,

    /// Plain interleaving of the program graphs, without communication
    Interleave,
}

impl FromStr for Composition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(Composition::Channel),
            "interleave" => Ok(Composition::Interleave),
            other => Err(Error::Config(format!("Unknown composition: {}", other))),
        }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Composition::Channel => write!(f, "channel"),
            Composition::Interleave => write!(f, "interleave"),
        }
    }
}

/// Unfolding configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UnfoldConfig {
    #[serde(default)]
    pub composition: Composition,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_output() -> String {
    "table".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file {:?}: {}", path, e)))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./state-unfold.toml
    /// 2. ~/.state-unfold/config.toml
    /// 3. /etc/state-unfold/config.toml
    pub fn load() -> Result<Self> {
        let mut paths = vec![PathBuf::from("state-unfold.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".state-unfold").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/state-unfold/config.toml"));

        for path in paths {
            if path.exists() {
                tracing::info!("Loading config from {:?}", path);
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }
}
