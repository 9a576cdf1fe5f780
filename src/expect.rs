//! Expectation matching for external process runs
//!
//! An [`Expectation`] describes what a checked program should do: the
//! exact exit code and patterns its output streams must start with.
//! Stream patterns are regular expressions anchored at the beginning of
//! the captured text, so checks read as "the output looks like X" rather
//! than byte-exact comparison.

use std::fmt;

use regex::Regex;
use serde::Deserialize;

use crate::common::{Error, Result};

/// Expected behavior of one external process run
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Expectation {
    /// Expected exit code, compared for exact equality
    #[serde(default)]
    pub exit_code: i32,

    /// Pattern the captured stdout must start with
    #[serde(default)]
    pub stdout: String,

    /// Pattern the captured stderr must start with
    #[serde(default)]
    pub stderr: String,
}

impl Expectation {
    /// Build an expectation, validating both stream patterns
    pub fn new(
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Result<Self> {
        let expectation = Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        };
        expectation.validate()?;
        Ok(expectation)
    }

    /// Check that both stream patterns compile
    pub fn validate(&self) -> Result<()> {
        anchored(&self.stdout)?;
        anchored(&self.stderr)?;
        Ok(())
    }

    /// Compare an actual process result against this expectation
    ///
    /// On divergence the returned [`Mismatch`] carries expected and actual
    /// values for all three channels, never a partial view.
    pub fn check(&self, exit_code: i32, stdout: &[u8], stderr: &[u8]) -> Result<()> {
        let stdout = String::from_utf8_lossy(stdout).into_owned();
        let stderr = String::from_utf8_lossy(stderr).into_owned();

        let matched = exit_code == self.exit_code
            && anchored(&self.stdout)?.is_match(&stdout)
            && anchored(&self.stderr)?.is_match(&stderr);

        if matched {
            Ok(())
        } else {
            Err(Mismatch {
                expected: self.clone(),
                exit_code,
                stdout,
                stderr,
            }
            .into())
        }
    }
}

/// Compile a pattern anchored at the start of the text
fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!(r"\A(?:{pattern})")).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Divergence between expected and actual process behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: Expectation,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected exit code {}, stdout ~ {:?}, stderr ~ {:?}; \
             got exit code {}, stdout {:?}, stderr {:?}",
            self.expected.exit_code,
            self.expected.stdout,
            self.expected.stderr,
            self.exit_code,
            self.stdout,
            self.stderr
        )
    }
}

impl std::error::Error for Mismatch {}
