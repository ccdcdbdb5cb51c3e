//! Log output for the `contact-relay` binary.
//!
//! Console output always goes to stderr. When [`LoggingConfig::dir`] is
//! set, a JSON layer also writes `contact-relay.log.YYYY-MM-DD` through a
//! non-blocking `tracing-appender` writer. `RUST_LOG` wins over the
//! configured level.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// File name prefix of the rotated log files.
pub const LOG_FILE_PREFIX: &str = "contact-relay.log";

/// Keeps the file writer alive. Dropping it flushes pending entries.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber described by `settings`.
///
/// Returns a guard when file output is enabled; hold it until exit.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(settings: &LoggingConfig) -> anyhow::Result<Option<LoggingGuard>> {
    let (file_layer, guard) = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().json().with_writer(writer);
            (Some(layer), Some(LoggingGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_for(&settings.level))
        .with(file_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(guard)
}
