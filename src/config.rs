//! Configuration module for the calc-server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values. Defaults
//! reproduce the original exercise's fixed constants: port 2205,
//! backlog 50, a 15000 ms run at a 1000 ms pause.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the calculator server
#[derive(Parser, Debug)]
#[command(name = "calc-server")]
#[command(author = "calc-server authors")]
#[command(version = "0.1.0")]
#[command(about = "A single-client TCP calculator server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:2205)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Total session duration in milliseconds
    #[arg(short = 'd', long)]
    pub test_duration: Option<u64>,

    /// Pause between iterations in milliseconds
    #[arg(short = 'p', long)]
    pub pause_duration: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Listen backlog for the accept queue
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
        }
    }
}

/// Session-related configuration
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Total session duration in milliseconds
    #[serde(default = "default_test_duration")]
    pub test_duration_ms: u64,
    /// Pause between iterations in milliseconds
    #[serde(default = "default_pause_duration")]
    pub pause_duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            test_duration_ms: default_test_duration(),
            pause_duration_ms: default_pause_duration(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:2205".to_string()
}

fn default_backlog() -> i32 {
    50
}

fn default_test_duration() -> u64 {
    15000 // 15 seconds
}

fn default_pause_duration() -> u64 {
    1000 // 1 second
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub backlog: i32,
    pub test_duration_ms: u64,
    pub pause_duration_ms: u64,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    /// Merge parsed CLI args with the optional TOML file and defaults.
    pub fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            backlog: toml_config.server.backlog,
            test_duration_ms: cli
                .test_duration
                .unwrap_or(toml_config.session.test_duration_ms),
            pause_duration_ms: cli
                .pause_duration
                .unwrap_or(toml_config.session.pause_duration_ms),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        };

        // The iteration budget divides by the pause.
        if config.pause_duration_ms == 0 {
            return Err(ConfigError::ZeroPause);
        }

        Ok(config)
    }

    /// Number of iterations the session performs: a fixed count derived
    /// from the total duration, regardless of elapsed wall time.
    pub fn iterations(&self) -> u64 {
        self.test_duration_ms / self.pause_duration_ms
    }

    /// Pause between iterations.
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_duration_ms)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    ZeroPause,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ZeroPause => {
                write!(f, "pause_duration_ms must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
