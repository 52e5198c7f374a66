// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration loaded from `gantry.toml`

use gantry_core::Project;
use gantry_engine::{DispatchStrategy, RuntimeConfig, DEFAULT_DISPATCH_TIMEOUT, DEFAULT_WRITE_ATTEMPTS};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONFIG_FILE: &str = "gantry.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("could not determine the data directory")]
    NoDataDir,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Database file; defaults to `gantry.db` under the data directory
    pub path: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CiConfig {
    /// Without a base URL triggers are accepted and dropped
    pub base_url: Option<String>,
    /// Bounds each trigger, both in the HTTP agent and around the call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen: SocketAddr,
    /// Base URL the CI system calls back on; defaults to `http://{listen}`
    pub callback_base_url: Option<String>,
    pub dispatch_strategy: DispatchStrategy,
    pub status_write_attempts: u32,
    /// Daemon log file; defaults to `gantryd.log` under the data directory
    pub log_path: Option<PathBuf>,
    pub store: StoreConfig,
    pub ci: CiConfig,
    pub projects: Vec<Project>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 7310)),
            callback_base_url: None,
            dispatch_strategy: DispatchStrategy::default(),
            status_write_attempts: DEFAULT_WRITE_ATTEMPTS,
            log_path: None,
            store: StoreConfig::default(),
            ci: CiConfig::default(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the user config directory when `path` is
    /// `None`. A missing default file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate TOML text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_write_attempts == 0 {
            return Err(ConfigError::Invalid(
                "status_write_attempts must be at least 1".to_string(),
            ));
        }
        check_http_url("callback_base_url", &self.callback_base_url())?;
        if let Some(base) = &self.ci.base_url {
            check_http_url("ci.base_url", base)?;
        }
        if self.ci.timeout.is_zero() {
            return Err(ConfigError::Invalid("ci.timeout must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            if project.id.as_str().trim().is_empty() {
                return Err(ConfigError::Invalid("project id cannot be empty".to_string()));
            }
            if !seen.insert(project.id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "project {} is defined more than once",
                    project.id
                )));
            }
        }
        Ok(())
    }

    pub fn callback_base_url(&self) -> String {
        self.callback_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.listen))
    }

    pub fn log_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.log_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("gantryd.log")),
        }
    }

    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("gantry.db")),
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        let mut runtime = RuntimeConfig::new(self.callback_base_url());
        runtime.dispatch_timeout = self.ci.timeout;
        runtime.dispatch_strategy = self.dispatch_strategy;
        runtime.status_write_attempts = self.status_write_attempts;
        runtime
    }
}

fn check_http_url(key: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::Invalid(format!("{key} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{key} must be http or https, got {other}"
        ))),
    }
}

/// Base directory for the database and log file
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("gantry"))
        .ok_or(ConfigError::NoDataDir)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gantry").join(CONFIG_FILE))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
