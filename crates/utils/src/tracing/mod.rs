use tracing::{span, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{info, Span};

/// Initialize the tracing system
///
/// Honours `RUST_LOG` and falls back to `info`. Output goes to stderr; ANSI
/// colouring is only enabled when stderr is a terminal. Fails when a global
/// subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Install a test-friendly subscriber, ignoring the error when one is
/// already installed by another test in the same binary.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("debug"))
        .unwrap_or_default();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}

/// Span covering one stage of cache startup
pub fn startup_span(stage: &'static str, root: &std::path::Path) -> Span {
    span!(Level::INFO, "startup", stage = stage, root = %root.display())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_for_tests_is_idempotent() {
        init_for_tests();
        init_for_tests();
        info!("tracing initialised twice without panicking");
    }

    #[test]
    fn test_startup_span_has_stage_metadata() {
        init_for_tests();
        let span = startup_span("scan", std::path::Path::new("/tmp"));
        let metadata = span.metadata();
        if let Some(metadata) = metadata {
            assert_eq!(metadata.name(), "startup");
        }
    }
}
