//! Diagnostic logging on stderr via `tracing`.
//!
//! User-facing reports go to stdout with `println!`; everything emitted here
//! is for operators reading container logs.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count: warn, info, debug, then trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `verbosity`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
