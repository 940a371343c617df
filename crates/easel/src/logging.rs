//! Log output for the CLI.

use easel_atelier::DebugLevel;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `level`. `RUST_LOG` takes
/// precedence when set.
pub fn init(level: DebugLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(level == DebugLevel::Verbose)
        .try_init();
}
