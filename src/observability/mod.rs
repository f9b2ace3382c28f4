//! Logging setup.
//!
//! All diagnostics go through `tracing` to stderr; stdout carries only the
//! reports. `RUST_LOG` takes precedence over the verbosity flags.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for a verbosity level.
pub fn filter_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbosity {
        0 => "info",
        1 => "analysis_sweep=debug,info",
        _ => "analysis_sweep=trace,debug",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity, quiet)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
