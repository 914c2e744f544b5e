use tracing_subscriber::{fmt, EnvFilter};

/// Initialize diagnostics on stderr.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (from settings) is used.
/// Stdout is left to the report rows.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // Ignored when a subscriber is already installed.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
