/*!
 * Configuration types for linetail
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TailError};

/// Main configuration for a tailer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailConfig {
    /// Delay between checks of the file for new content, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Buffer size in bytes for reading appended data
    #[serde(default = "default_buf_size")]
    pub buf_size: usize,

    /// Byte offset to start reading from
    #[serde(default)]
    pub start_position: u64,

    /// Start from the current end of file instead of `start_position`
    #[serde(default)]
    pub from_end: bool,

    /// Close and reopen the file between read passes.
    /// Needed on filesystems where a held-open handle pins a rotated
    /// file's data (e.g. some network mounts).
    #[serde(default)]
    pub reopen: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

fn default_delay_ms() -> u64 {
    100
}

fn default_buf_size() -> usize {
    4096
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            buf_size: default_buf_size(),
            start_position: 0,
            from_end: false,
            reopen: false,
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}

impl TailConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TailConfig =
            toml::from_str(&contents).map_err(|e| TailError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| TailError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.buf_size == 0 {
            return Err(TailError::Config("buf_size must be non-zero".to_string()));
        }
        if self.delay_ms == 0 {
            return Err(TailError::Config(
                "delay_ms must be non-zero to avoid busy-looping".to_string(),
            ));
        }
        Ok(())
    }

    /// The poll delay as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
