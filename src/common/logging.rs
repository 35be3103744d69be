//! Logging and tracing configuration
//!
//! One-shot commands log compactly to stderr. The long-running application
//! also appends to a log file since stdout belongs to the display.

use std::path::PathBuf;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::paths;

const LOG_FILE: &str = "training-bridge.log";

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("training_bridge=info,warn"))
}

fn stderr_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
}

fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
}

/// Initialize tracing for one-shot commands (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(stderr_layer())
        .init();
}

/// Initialize tracing for the application (file + stderr logging)
///
/// Returns the log file path and the writer guard; the guard must live
/// until shutdown or buffered lines are lost.
pub fn init_app() -> (Option<PathBuf>, Option<WorkerGuard>) {
    if let Some(log_dir) = paths::log_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(default_filter())
                .with(file_layer(writer))
                .with(stderr_layer())
                .init();

            return (Some(log_dir.join(LOG_FILE)), Some(guard));
        }
    }

    // Fallback: stderr only
    init_cli();
    (None, None)
}
