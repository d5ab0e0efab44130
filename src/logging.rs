//! Log sink for the hostwatch binaries.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! also picks those records up. Filtering follows `RUST_LOG`, e.g.
//!
//! ```bash
//! RUST_LOG=hostwatch=debug hostwatch
//! ```

use tracing_subscriber::EnvFilter;

/// Install the subscriber, writing to stderr so stdout stays free for
/// reports. `default_filter` applies when `RUST_LOG` is unset or invalid.
pub fn setup_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
