//! Utilities for logging.
use std::io;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

/// Build the env filter, falling back to `default_level` when `RUST_LOG`
/// isn't set.
fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Configure the global tracing subscriber.
///
/// Subsequent calls are no-ops, the first configured subscriber wins.
pub fn configure_global_logger<W>(default_level: Level, format: LogFormat, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(writer)
        .with_thread_ids(true)
        .with_thread_names(true);

    // Errors only if a global subscriber is already set, which happens in
    // tests.
    let _ = match format {
        LogFormat::HumanReadable => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Configure a logger suitable for tests, writing to the test writer.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_test_writer()
        .try_init();
}

/// Convenience for binaries that log to stderr.
pub fn configure_stderr_logger(default_level: Level, format: LogFormat) {
    configure_global_logger(default_level, format, io::stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_twice_is_noop() {
        configure_global_logger(Level::WARN, LogFormat::HumanReadable, io::sink);
        configure_global_logger(Level::DEBUG, LogFormat::Json, io::sink);
        tracing::warn!("still works");
    }
}
