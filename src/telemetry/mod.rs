//! Logging setup
//!
//! Installs the global `tracing` subscriber from [`LoggingConfig`]. `RUST_LOG`
//! wins over the configured level when set.
//!
//! ## Example
//!
//! ```rust,ignore
//! use omegatron::config::LoggingConfig;
//! use omegatron::telemetry::init_subscriber;
//!
//! // Keep the guard alive, otherwise buffered file output is lost.
//! let _guard = init_subscriber(&LoggingConfig::default())?;
//! ```

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::StartupError;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("warn,omegatron={level}")
}

/// Subscriber installed by [`init_subscriber`]
pub type BoxSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

/// Build the subscriber described by `config` without installing it.
///
/// Also returns the file writer guard when `config.file` is set.
pub fn build_subscriber(
    config: &LoggingConfig,
) -> Result<(BoxSubscriber, Option<WorkerGuard>), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(&config.level)))
        .map_err(|e| StartupError::Config(format!("invalid log filter: {e}")))?;

    let (writer, guard, ansi) = match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().ok_or_else(|| {
                StartupError::Config(format!("log file `{}` has no file name", path.display()))
            })?;
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), None, true),
    };

    let subscriber: BoxSubscriber = match config.format {
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .finish(),
        ),
        LogFormat::JsonCompact => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(true)
                .json()
                .flatten_event(true)
                .finish(),
        ),
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .finish(),
        ),
    };
    Ok((subscriber, guard))
}

/// Initialize the global tracing subscriber.
///
/// Returns the file writer guard when `config.file` is set; it must be kept
/// alive for the lifetime of the process. Calling this when a subscriber is
/// already installed is not an error.
pub fn init_subscriber(config: &LoggingConfig) -> Result<Option<WorkerGuard>, StartupError> {
    let (subscriber, guard) = build_subscriber(config)?;
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        // A subscriber installed earlier (tests, embedding applications) stays.
        tracing::debug!("tracing subscriber already initialized: {}", e);
    }
    Ok(guard)
}
