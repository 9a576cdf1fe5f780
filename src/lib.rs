//! Regression-test harness for the mbus message-bus daemon
//!
//! Launches the daemon under test, runs independent scenarios against its
//! client programs, collects pass/fail outcomes, shuts the daemon down and
//! reports a summary.

pub mod cli;
pub mod commands;
pub mod common;
pub mod expect;
pub mod process;
pub mod report;
pub mod runner;
pub mod scenario;

// Re-export commonly used types for scenarios and tests
pub use common::{Config, Error, Result};
pub use expect::Expectation;
pub use process::ProcessHandle;
pub use report::{RunReport, ScenarioOutcome, ScenarioStatus};
pub use runner::Runner;
pub use scenario::{Scenario, ScenarioContext, ScenarioRegistry};
