//! Configuration file handling
//!
//! The harness is configured from a TOML file next to the project under
//! test (`mbus-regress.toml` in the working directory, or `--config`).
//! Every section is optional and falls back to its defaults.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use super::{Error, Result};

/// Config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mbus-regress.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Binary name -> path overrides for the daemon and client programs
    #[serde(default)]
    pub binaries: HashMap<String, PathBuf>,

    /// Daemon under test
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Scenario discovery
    #[serde(default)]
    pub scenarios: ScenarioConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Configuration for the daemon kept alive across the whole run
#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    /// Binary name of the daemon
    #[serde(default = "default_daemon_binary")]
    pub binary: String,

    /// Arguments the daemon is started with
    #[serde(default)]
    pub args: Vec<String>,

    /// Window watched for an immediate daemon exit after launch, in
    /// milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Optional readiness probe run after the settle window
    #[serde(default)]
    pub ready: Option<ReadyProbe>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            binary: default_daemon_binary(),
            args: Vec::new(),
            settle_ms: default_settle_ms(),
            ready: None,
        }
    }
}

fn default_daemon_binary() -> String {
    "mbusd".to_string()
}
fn default_settle_ms() -> u64 {
    200
}

/// A client command retried until it exits 0, confirming the daemon
/// actually serves requests
#[derive(Debug, Deserialize, Clone)]
pub struct ReadyProbe {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_ready_attempts")]
    pub attempts: u32,

    #[serde(default = "default_ready_interval_ms")]
    pub interval_ms: u64,
}

fn default_ready_attempts() -> u32 {
    20
}
fn default_ready_interval_ms() -> u64 {
    50
}

/// Scenario discovery settings
#[derive(Debug, Deserialize)]
pub struct ScenarioConfig {
    /// Directory scanned for scenario definition files
    #[serde(default = "default_scenario_dir")]
    pub dir: PathBuf,

    /// Filename pattern recognizing scenario definitions
    #[serde(default = "default_scenario_pattern")]
    pub pattern: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            dir: default_scenario_dir(),
            pattern: default_scenario_pattern(),
        }
    }
}

fn default_scenario_dir() -> PathBuf {
    PathBuf::from("scenarios")
}
fn default_scenario_pattern() -> String {
    r".+\.ya?ml$".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Bound on every blocking wait for a child process
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            wait_secs: default_wait_secs(),
        }
    }
}

fn default_wait_secs() -> u64 {
    30
}

impl Timeouts {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

impl Config {
    /// Load configuration from `path`, or from `mbus-regress.toml` in the
    /// working directory if present, falling back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolve a binary name to a launchable path
    ///
    /// Checks the explicit `[binaries]` map first; names that already look
    /// like paths pass through untouched; everything else is searched on
    /// `$PATH`.
    pub fn resolve_binary(&self, name: &str) -> Result<PathBuf> {
        if let Some(path) = self.binaries.get(name) {
            return Ok(path.clone());
        }

        let candidate = Path::new(name);
        if candidate.is_absolute() || candidate.components().count() > 1 {
            return Ok(candidate.to_path_buf());
        }

        which::which(name).map_err(|_| {
            Error::Config(format!(
                "binary '{name}' not configured and not found on PATH"
            ))
        })
    }

    /// Compiled scenario filename pattern
    pub fn scenario_pattern(&self) -> Result<Regex> {
        Regex::new(&self.scenarios.pattern).map_err(|source| Error::Pattern {
            pattern: self.scenarios.pattern.clone(),
            source,
        })
    }
}
