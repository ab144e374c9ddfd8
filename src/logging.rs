//! Thin logging layer over `tracing`.
//!
//! External tools write progress line-by-line on stdout/stderr; [`log`] is the
//! single funnel those lines go through before reaching the subscriber.

use tracing::Level;

/// Initializes the global subscriber for the binary.
///
/// Respects `RUST_LOG`, defaulting to `info` when unset.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Logs `message` at `level`, defaulting to [`Level::INFO`].
///
/// A single trailing line terminator is trimmed so that lines read from child
/// process pipes don't double-space the output.
pub fn log(message: &str, level: Option<Level>) {
    let message = trim_line_terminator(message);
    let level = level.unwrap_or(Level::INFO);
    if level == Level::ERROR {
        tracing::error!("{message}");
    } else if level == Level::WARN {
        tracing::warn!("{message}");
    } else if level == Level::DEBUG {
        tracing::debug!("{message}");
    } else if level == Level::TRACE {
        tracing::trace!("{message}");
    } else {
        tracing::info!("{message}");
    }
}

fn trim_line_terminator(message: &str) -> &str {
    message
        .strip_suffix("\r\n")
        .or_else(|| message.strip_suffix('\n'))
        .or_else(|| message.strip_suffix('\r'))
        .unwrap_or(message)
}
