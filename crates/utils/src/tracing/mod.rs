use misebridge_core::LOG_ENV_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Directives come from `MISEBRIDGE_LOG`, then `RUST_LOG`, then `default_level`.
/// Output goes to stderr so stdout stays clean for command results.
pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if stderr is attached to a terminal
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one project's lifetime
pub fn project_span(name: &str, work_dir: &str) -> Span {
    span!(Level::INFO, "project", project = %name, work_dir = %work_dir)
}
