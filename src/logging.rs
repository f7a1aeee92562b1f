//! Diagnostic tracing to stderr, controlled by `RUST_LOG`.
//!
//! Command results go to stdout; this output never mixes with them.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Defaults to `warn` when `RUST_LOG` is unset, e.g.
/// `RUST_LOG=coin_islands=debug islands transfer ...`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
