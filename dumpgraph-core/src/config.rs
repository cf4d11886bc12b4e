//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/dumpgraph/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/dumpgraph/` (~/.config/dumpgraph/)
//! - State/Logs: `$XDG_STATE_HOME/dumpgraph/` (~/.local/state/dumpgraph/)
//!
//! The dump root may also be supplied via the `DUMPGRAPH_DUMP_DIRECTORY`
//! environment variable, which takes precedence over the config file.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable overriding `[dump] root`.
pub const DUMP_DIRECTORY_ENV: &str = "DUMPGRAPH_DUMP_DIRECTORY";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Dump corpus location
    #[serde(default)]
    pub dump: DumpConfig,

    /// Scratch directory for transient artifacts
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Throttling and timeout limits
    #[serde(default)]
    pub limits: LimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dump corpus configuration
#[derive(Debug, Deserialize, Default)]
pub struct DumpConfig {
    /// Root directory holding archived dump files
    pub root: Option<PathBuf>,
}

/// Scratch directory configuration
#[derive(Debug, Deserialize)]
pub struct ScratchConfig {
    /// Directory for transient tabular/image artifacts
    #[serde(default = "default_scratch_dir")]
    pub dir: PathBuf,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: default_scratch_dir(),
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("dumpgraph")
}

/// Throttling and timeout limits
#[derive(Debug, Deserialize, Clone)]
pub struct LimitConfig {
    /// Invocations allowed per requester per window
    #[serde(default = "default_rate_limit_invocations")]
    pub rate_limit_invocations: usize,

    /// Rate-limit window length in seconds
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Wall-clock bound on a whole pipeline run in seconds
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            rate_limit_invocations: default_rate_limit_invocations(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

fn default_rate_limit_invocations() -> usize {
    3
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_run_timeout_secs() -> u64 {
    120
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Resolve the dump root, honoring the environment override.
    pub fn dump_root(&self) -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(DUMP_DIRECTORY_ENV) {
            return Ok(PathBuf::from(path));
        }
        self.dump.root.clone().ok_or_else(|| {
            Error::Config(format!(
                "dump.root is not set (config file or {})",
                DUMP_DIRECTORY_ENV
            ))
        })
    }

    /// Validate startup conditions: the dump root must point at a readable
    /// directory, and the scratch directory must be creatable.
    ///
    /// Absence of either is a fatal startup condition, not a per-request
    /// error.
    pub fn validate(&self) -> Result<()> {
        let root = self.dump_root()?;
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "dump.root does not point to a valid directory: {}",
                root.display()
            )));
        }

        std::fs::create_dir_all(&self.scratch.dir).map_err(|e| {
            Error::Config(format!(
                "failed to create scratch directory {}: {}",
                self.scratch.dir.display(),
                e
            ))
        })?;

        if self.limits.rate_limit_invocations == 0 {
            return Err(Error::Config(
                "limits.rate_limit_invocations must be at least 1".to_string(),
            ));
        }
        if self.limits.run_timeout_secs == 0 {
            return Err(Error::Config(
                "limits.run_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/dumpgraph/config.toml` (~/.config/dumpgraph/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("dumpgraph").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/dumpgraph/` (~/.local/state/dumpgraph/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("dumpgraph")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.dump.root.is_none());
        assert_eq!(config.limits.rate_limit_invocations, 3);
        assert_eq!(config.limits.rate_limit_window_secs, 60);
        assert_eq!(config.limits.run_timeout_secs, 120);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[dump]
root = "/var/dumps"

[scratch]
dir = "/tmp/dumpgraph-test"

[limits]
rate_limit_invocations = 5
run_timeout_secs = 30

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.dump.root.as_deref(), Some(Path::new("/var/dumps")));
        assert_eq!(config.scratch.dir, PathBuf::from("/tmp/dumpgraph-test"));
        assert_eq!(config.limits.rate_limit_invocations, 5);
        assert_eq!(config.limits.run_timeout_secs, 30);
        // Unspecified limit keeps its default
        assert_eq!(config.limits.rate_limit_window_secs, 60);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let config: Config = toml::from_str(
            r#"
[dump]
root = "/definitely/not/a/real/directory/dumpgraph"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[dump]
root = "{}"

[limits]
rate_limit_invocations = 0
"#,
            dir.path().display()
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
