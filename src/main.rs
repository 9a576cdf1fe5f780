//! Regression-test harness for the mbus message-bus daemon

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use mbus_regress::commands::Commands;
use mbus_regress::{cli, common};

#[derive(Parser)]
#[command(name = "mbus-regress", about = "Regression-test harness for the mbus daemon")]
#[command(version, long_about = None)]
struct Cli {
    /// Print full error chains instead of the one-line fatal report
    #[arg(short, long)]
    debug: bool,

    /// Display usage and exit
    #[arg(short = 'u', long)]
    usage: bool,

    /// Path to the harness configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion =>
        {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error parsing arguments: {e}");
            return ExitCode::from(1);
        }
    };

    common::logging::init(cli.debug);

    if cli.usage {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        eprintln!("error parsing arguments: command not specified");
        return ExitCode::from(1);
    };

    match cli::dispatch(command, cli.config.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.debug {
                eprintln!("fatal regression error: {e:?}");
            } else {
                eprintln!("fatal regression error: {e}");
            }
            ExitCode::from(1)
        }
    }
}
