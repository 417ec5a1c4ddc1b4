//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise the `debug` flag picks
/// between verbose crate-level diagnostics and plain info logging.
///
/// Safe to call once per process; later calls are ignored.
pub fn init_logging(debug: bool) {
    let default_directives = if debug { "tilevault=debug,info" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
