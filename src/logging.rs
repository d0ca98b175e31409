use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes the logging system with both console and file output.
///
/// `RUST_LOG` wins over the configured default filter. Keep the returned guard
/// alive for the life of the process so buffered file logs are flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Fall back to console-only logging if the log directory is unusable
    if let Err(e) = fs::create_dir_all(&config.directory) {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stdout))
            .try_init();
        tracing::warn!(
            "Could not create log directory {}: {}",
            config.directory.display(),
            e
        );
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stdout))
        .try_init();

    Some(guard)
}
