//! Configuration management for hotmark.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable overrides
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Complete configuration for hotmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reporting server configuration.
    pub server: ServerConfig,
    /// Monitor registry configuration.
    pub registry: RegistryConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Feature flags.
    pub features: FeatureConfig,
    /// Debug mode.
    #[serde(skip)]
    pub debug: bool,
}

/// Reporting server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP port serving `/top_list`, `/reset_result` and `/monitor_pid`.
    pub http_port: u16,
    /// Bind address for the reporting server.
    pub bind_address: IpAddr,
}

/// Monitor registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of live monitor points.
    pub max_points: usize,
    /// Bucket count for the name hash table (rounded up to a power of two).
    pub buckets: usize,
    /// Worker counter slots per point; 0 means one per available CPU.
    pub workers: usize,
    /// Initial value of the uninterpreted `monitor_pid` cell.
    pub monitor_pid: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: LogLevel,
}

/// Feature flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Register built-in demo points and drive start/end load against them.
    pub demo_points: bool,
    /// Interval between demo load iterations.
    #[serde(with = "humantime_serde")]
    pub demo_interval: Duration,
}

/// Log levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
            features: FeatureConfig::default(),
            debug: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: 8080,
            bind_address: "0.0.0.0".parse().expect("valid default IP address"),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            max_points: 128,
            buckets: 16,
            workers: 0,
            monitor_pid: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            demo_points: false,
            demo_interval: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Create new config with defaults.
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.http_port == 0 {
            return Err(MonitorError::config("http_port must be greater than 0"));
        }

        if self.registry.max_points == 0 {
            return Err(MonitorError::config("max_points must be greater than 0"));
        }

        if self.registry.buckets == 0 {
            return Err(MonitorError::config("buckets must be greater than 0"));
        }

        if self.features.demo_points && self.features.demo_interval.is_zero() {
            return Err(MonitorError::config("demo_interval must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for assembling a [`Config`] from file, environment and CLI layers.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a YAML document over the current state.
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)?;
        Ok(self)
    }

    /// Set the reporting server port.
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.server.http_port = port;
        self
    }

    /// Set the registry point capacity.
    pub fn max_points(mut self, max_points: usize) -> Self {
        self.config.registry.max_points = max_points;
        self
    }

    /// Set the worker slot count (0 = auto).
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.registry.workers = workers;
        self
    }

    /// Set the initial `monitor_pid` value.
    pub fn monitor_pid(mut self, pid: u64) -> Self {
        self.config.registry.monitor_pid = pid;
        self
    }

    /// Enable or disable the demo load generator.
    pub fn demo_points(mut self, enabled: bool) -> Self {
        self.config.features.demo_points = enabled;
        self
    }

    /// Enable debug mode.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Validate and produce the final configuration.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
