//! Logging and tracing configuration
//!
//! Run progress and shutdown warnings go through `tracing`; `RUST_LOG`
//! overrides the defaults.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the harness
///
/// Default level is INFO for this crate, WARN for dependencies; `debug`
/// raises the crate level to DEBUG.
pub fn init(debug: bool) {
    let default = if debug {
        "mbus_regress=debug,info"
    } else {
        "mbus_regress=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
