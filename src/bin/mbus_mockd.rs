//! Stand-in message-bus daemon for integration testing
//!
//! Sleeps until terminated and exits 0 on SIGTERM/SIGINT, mimicking an
//! orderly daemon shutdown. `--fail` exits immediately with a diagnostic,
//! exercising the harness's startup check.

use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if std::env::args().any(|arg| arg == "--fail") {
        eprintln!("mbus-mockd: refusing to start");
        return ExitCode::from(3);
    }

    wait_for_shutdown().await;
    ExitCode::SUCCESS
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("install SIGINT handler");

    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
