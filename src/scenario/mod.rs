//! Scenario contract and execution context
//!
//! A scenario is one independent test case: optional setup, the checks,
//! optional cleanup. The runner guarantees `finalize` is invoked once
//! `init` has been entered, whatever `run` does, and that scenarios never
//! share state with one another. The daemon under test is already running
//! when a scenario starts and is not restarted by it; helpers a scenario
//! needs are its own to launch and clean up.

mod file;
mod registry;

pub use file::{FileScenario, ScenarioSpec};
pub use registry::ScenarioRegistry;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::{Config, Result};
use crate::expect::Expectation;
use crate::process::ProcessHandle;

/// One independent test case run by the orchestrator
#[async_trait]
pub trait Scenario: Send {
    /// Scenario-specific setup, e.g. launching a helper client process
    async fn init(&mut self, _cx: &ScenarioContext<'_>) -> Result<()> {
        Ok(())
    }

    /// The actual checks; signal an assertion failure with
    /// [`crate::Error::ScenarioFailure`] or by returning a mismatch
    async fn run(&mut self, cx: &ScenarioContext<'_>) -> Result<()>;

    /// Cleanup, always invoked after `run`
    async fn finalize(&mut self, _cx: &ScenarioContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Capabilities handed to a scenario while it executes
///
/// Deliberately excludes the daemon handle: scenarios talk to the daemon
/// through its client programs only.
pub struct ScenarioContext<'a> {
    config: &'a Config,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Resolve a binary name to a launchable path
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        self.config.resolve_binary(name)
    }

    /// Timeout applied to blocking waits on child processes
    pub fn wait_timeout(&self) -> Duration {
        self.config.timeouts.wait()
    }

    /// Launch a process by binary name
    pub fn spawn(&self, name: &str, args: &[String]) -> Result<ProcessHandle> {
        ProcessHandle::start(self.resolve(name)?, args)
    }

    /// Run a program to completion and check it against `expected`
    pub async fn expect_run(
        &self,
        name: &str,
        args: &[String],
        expected: &Expectation,
    ) -> Result<()> {
        let mut handle = self.spawn(name, args)?;
        let (stdout, stderr) = handle.communicate(self.wait_timeout()).await?;
        let code = handle.wait(self.wait_timeout()).await?;
        expected.check(code, &stdout, &stderr)
    }
}
