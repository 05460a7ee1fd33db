//! Structured logging setup.
//!
//! Builds a `tracing_subscriber::registry()` with JSON-vs-pretty branching
//! and an `EnvFilter` seeded from the configured level, optionally writing
//! through a `tracing-appender` non-blocking file layer.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;

/// Holds the non-blocking writer guard; dropping it flushes pending log
/// lines, so callers must keep this alive for the process lifetime.
pub struct LoggerGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init(config: &LoggingConfig) -> LoggerGuard {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let is_json = config.format == "json";

    let (file_layer, file_guard) = match &config.file_path {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("swarm1.log");
            let appender = tracing_appender::rolling::never(dir, filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (Some(non_blocking), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if is_json {
        let stdout_layer = tracing_subscriber::fmt::layer().json();
        match file_layer {
            Some(writer) => {
                let file_json_layer = tracing_subscriber::fmt::layer().json().with_writer(writer);
                registry.with(stdout_layer).with(file_json_layer).init();
            }
            None => {
                registry.with(stdout_layer).init();
            }
        }
    } else {
        let stdout_layer = tracing_subscriber::fmt::layer().pretty();
        match file_layer {
            Some(writer) => {
                let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
                registry.with(stdout_layer).with(file_layer).init();
            }
            None => {
                registry.with(stdout_layer).init();
            }
        }
    }

    LoggerGuard {
        _file_guard: file_guard,
    }
}
