// Logging - tracing subscriber setup for the CLI and embedding services

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither RUST_LOG nor the config names one
pub const DEFAULT_FILTER: &str = "info";

/// Build the filter: RUST_LOG wins, then `configured`, then the default.
pub fn env_filter(configured: Option<&str>) -> EnvFilter {
    let fallback = configured
        .filter(|level| !level.trim().is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a stderr subscriber. Stdout stays free for JSON output.
/// A second call is a no-op.
pub fn init_logging(configured: Option<&str>) {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter(configured))
        .with(console)
        .try_init();
}
