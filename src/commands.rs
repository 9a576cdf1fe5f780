//! CLI command definitions
//!
//! Defines the clap commands for the regression harness.

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run regression scenarios against the daemon
    Run {
        /// Scenario names to run; every discovered scenario when empty
        names: Vec<String>,
    },
}
