//! CLI command handling
//!
//! Dispatches parsed commands to the runner and renders the report.
//! Individual scenario failures are part of the report, not of the exit
//! code; only fatal orchestration errors propagate out of here.

use std::path::Path;

use crate::commands::Commands;
use crate::common::{Config, Result};
use crate::runner::Runner;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Option<&Path>) -> Result<()> {
    match command {
        Commands::Run { names } => {
            let config = Config::load(config)?;
            let runner = Runner::new(config);
            let report = runner.run(&names).await?;
            print!("{}", report.render());
            Ok(())
        }
    }
}
