//! Scenarios defined as YAML documents
//!
//! A scenario file holds optional helper processes to start, the ordered
//! list of checks, and optional teardown commands. The file stem is the
//! scenario's identifier.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::common::{Error, Result};
use crate::expect::Expectation;
use crate::process::{self, ProcessHandle};

use super::{Scenario, ScenarioContext};

/// Parsed scenario definition
#[derive(Debug, Deserialize)]
pub struct ScenarioSpec {
    /// What the scenario verifies
    #[serde(default)]
    pub description: Option<String>,

    /// Helper processes started before the checks and held until finalize
    #[serde(default)]
    pub setup: Vec<HelperSpec>,

    /// Checks run in order against the daemon's client programs
    pub checks: Vec<CheckSpec>,

    /// Commands run during finalize, after the helpers are stopped
    #[serde(default)]
    pub teardown: Vec<CommandSpec>,
}

/// A helper process held for the duration of the scenario
#[derive(Debug, Deserialize)]
pub struct HelperSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Window watched for an early helper exit before proceeding, in
    /// milliseconds
    #[serde(default = "default_helper_settle_ms")]
    pub settle_ms: u64,
}

fn default_helper_settle_ms() -> u64 {
    50
}

/// One expectation-checked program run
#[derive(Debug, Deserialize)]
pub struct CheckSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub expect: Expectation,
}

/// A teardown command; its exit code is not checked
#[derive(Debug, Deserialize)]
pub struct CommandSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl ScenarioSpec {
    /// Load and validate a scenario definition from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ScenarioParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let spec: ScenarioSpec =
            serde_yaml::from_str(&content).map_err(|e| Error::ScenarioParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        for check in &spec.checks {
            check.expect.validate()?;
        }
        Ok(spec)
    }
}

/// A scenario backed by a [`ScenarioSpec`] file
pub struct FileScenario {
    name: String,
    spec: ScenarioSpec,
    helpers: Vec<ProcessHandle>,
}

impl FileScenario {
    /// Load the scenario definition at `path` under the given identifier
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            spec: ScenarioSpec::load(path)?,
            helpers: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.spec.description.as_deref()
    }
}

#[async_trait]
impl Scenario for FileScenario {
    async fn init(&mut self, cx: &ScenarioContext<'_>) -> Result<()> {
        for helper in &self.spec.setup {
            let mut handle = cx.spawn(&helper.program, &helper.args)?;
            let window = Duration::from_millis(helper.settle_ms);
            if let Some(code) = process::settle(&mut handle, window).await? {
                let stderr = match handle.communicate(cx.wait_timeout()).await {
                    Ok((_, stderr)) => String::from_utf8_lossy(&stderr).trim().to_string(),
                    Err(_) => String::new(),
                };
                return Err(Error::ScenarioFailure(format!(
                    "helper '{}' exited early with code {code}: {stderr}",
                    helper.program
                )));
            }
            self.helpers.push(handle);
        }
        Ok(())
    }

    async fn run(&mut self, cx: &ScenarioContext<'_>) -> Result<()> {
        for check in &self.spec.checks {
            cx.expect_run(&check.program, &check.args, &check.expect)
                .await?;
        }
        Ok(())
    }

    async fn finalize(&mut self, cx: &ScenarioContext<'_>) -> Result<()> {
        let mut first_err = None;

        for mut handle in self.helpers.drain(..) {
            handle.terminate();
            if let Err(e) = handle.wait(cx.wait_timeout()).await {
                first_err.get_or_insert(e);
            }
        }

        for cmd in &self.spec.teardown {
            let result = async {
                let mut handle = cx.spawn(&cmd.program, &cmd.args)?;
                handle.wait(cx.wait_timeout()).await?;
                Ok::<_, Error>(())
            }
            .await;
            if let Err(e) = result {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
