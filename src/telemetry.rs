//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "CONDUCTOR_LOG";

/// Installs the global fmt subscriber writing to stderr.
///
/// The filter comes from `CONDUCTOR_LOG` (for example `debug` or
/// `conductor=trace`) and defaults to `info`. Returns `false` when a global
/// subscriber was already installed.
#[must_use]
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
