//! Configuration loading and types

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use npmkit_pkg::{ExitStatusPolicy, OptionValue};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "NPMKIT_CONFIG";

/// Top-level configuration for npmkit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// npm invocation settings
    #[serde(default)]
    pub npm: NpmConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// npm invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NpmConfig {
    /// npm binary (name on `PATH` or absolute path)
    #[serde(default = "default_program")]
    pub program: String,
    /// Directory to run npm in (defaults to the current directory)
    pub working_dir: Option<PathBuf>,
    /// Default `--loglevel`
    pub loglevel: Option<String>,
    /// Default `--production`
    #[serde(default)]
    pub production: bool,
    /// How a non-zero npm exit status is reported
    #[serde(default)]
    pub exit_policy: ExitStatusPolicy,
    /// Shorthand for `exit_policy = "fail"`
    #[serde(default)]
    pub strict_exit: bool,
    /// Extra flags passed to every command
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            working_dir: None,
            loglevel: None,
            production: false,
            exit_policy: ExitStatusPolicy::default(),
            strict_exit: false,
            options: BTreeMap::new(),
        }
    }
}

impl NpmConfig {
    /// Exit status policy after applying `strict_exit`
    #[must_use]
    pub fn effective_exit_policy(&self) -> ExitStatusPolicy {
        if self.strict_exit {
            ExitStatusPolicy::Fail
        } else {
            self.exit_policy
        }
    }
}

fn default_program() -> String {
    "npm".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid configuration
    pub fn parse(content: &str) -> eyre::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Find the config file to use, if any
    ///
    /// Checks `NPMKIT_CONFIG`, then `./npmkit.toml`, then the user config
    /// directory.
    #[must_use]
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let candidates = [
            Some(PathBuf::from("npmkit.toml")),
            dirs::config_dir().map(|p| p.join("npmkit/npmkit.toml")),
        ];

        candidates.into_iter().flatten().find(|path| path.exists())
    }
}
