//! Run outcomes and summary rendering

use std::fmt::Write as _;

use colored::Colorize;

use crate::common::Result;

/// Recorded result of one scenario execution
///
/// Built once, with its scenario name fixed at construction; never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    name: String,
    status: ScenarioStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStatus {
    Passed,
    /// The scenario's checks reported a failure
    Failed { message: String },
    /// The scenario died with an error its checks did not anticipate
    Error { message: String },
}

impl ScenarioOutcome {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Passed,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Failed {
                message: message.into(),
            },
        }
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Error {
                message: message.into(),
            },
        }
    }

    /// Classify a scenario result: explicit check failures against
    /// everything else
    pub fn from_result(name: &str, result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::passed(name),
            Err(e) if e.is_check_failure() => Self::failed(name, e.to_string()),
            Err(e) => Self::error(name, e.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &ScenarioStatus {
        &self.status
    }

    pub fn is_passed(&self) -> bool {
        matches!(self.status, ScenarioStatus::Passed)
    }
}

/// Accumulated outcomes of one run, in execution order
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    pub fn new(outcomes: Vec<ScenarioOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn record(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ScenarioOutcome] {
        &self.outcomes
    }

    /// How many scenarios were executed
    pub fn executed(&self) -> usize {
        self.outcomes.len()
    }

    /// Outcomes that did not pass, in execution order
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.is_passed())
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::is_passed)
    }

    /// Render the final summary: total executed, failed scenarios with
    /// their messages, and a closing pass/fail line
    pub fn render(&self) -> String {
        let mut out = String::new();
        let noun = if self.executed() == 1 {
            "scenario"
        } else {
            "scenarios"
        };
        let _ = writeln!(out, "regression ended, {} {} run", self.executed(), noun);

        let failures: Vec<_> = self.failures().collect();
        if failures.is_empty() {
            let _ = writeln!(out, "{} all scenarios successful", "✓".green());
        } else {
            let _ = writeln!(
                out,
                "{} {} of {} {} failed:",
                "✗".red(),
                failures.len(),
                self.executed(),
                noun
            );
            for outcome in failures {
                match outcome.status() {
                    ScenarioStatus::Failed { message } => {
                        let _ = writeln!(out, "  {}: {}", outcome.name(), message);
                    }
                    ScenarioStatus::Error { message } => {
                        let _ = writeln!(
                            out,
                            "  {} (unexpected error): {}",
                            outcome.name(),
                            message
                        );
                    }
                    ScenarioStatus::Passed => {}
                }
            }
        }
        out
    }
}
