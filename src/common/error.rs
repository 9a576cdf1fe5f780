//! Error types for the regression harness
//!
//! One taxonomy covers the whole run: fatal orchestration errors (daemon
//! startup, configuration) and scenario-local failures the runner contains
//! and records instead of propagating.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::expect::Mismatch;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the regression harness
#[derive(Error, Debug)]
pub enum Error {
    // === Process errors ===
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("daemon '{program}' exited during startup with code {code}: {stderr}")]
    DaemonStartup {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("daemon readiness probe '{probe}' did not succeed after {attempts} attempts")]
    DaemonNotReady { probe: String, attempts: u32 },

    #[error("timed out after {0} seconds waiting for process exit")]
    Timeout(u64),

    // === Scenario errors ===
    #[error(transparent)]
    Mismatch(#[from] Mismatch),

    #[error("scenario check failed: {0}")]
    ScenarioFailure(String),

    #[error("no scenario named '{0}' is registered")]
    UnknownScenario(String),

    #[error("invalid scenario file '{path}': {message}")]
    ScenarioParse { path: PathBuf, message: String },

    // === Configuration errors ===
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration file '{path}': {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a launch error carrying the program identity
    pub fn launch(program: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            source,
        }
    }

    /// True for failures a scenario's checks report deliberately, as
    /// opposed to unexpected errors. The runner records the former as
    /// `Failed` and the latter as `Error` outcomes.
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Error::ScenarioFailure(_) | Error::Mismatch(_))
    }
}
