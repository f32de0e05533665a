use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use once_cell::sync::Lazy;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::time::UtcTime, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "INVOICING_LOG";
pub const DEFAULT_FILTER: &str = "invoicing=info,sqlx=warn";
pub const LOG_FILE_NAME: &str = "invoicing.log";

const MAX_LOG_BYTES: usize = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static FILE_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn rotating_file(dir: &Path) -> anyhow::Result<FileRotate<AppendCount>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);

    #[cfg(unix)]
    let writer = FileRotate::new(
        path,
        AppendCount::new(MAX_LOG_FILES),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::None,
        None,
    );
    #[cfg(not(unix))]
    let writer = FileRotate::new(
        path,
        AppendCount::new(MAX_LOG_FILES),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::None,
    );
    Ok(writer)
}

/// Install the global subscriber: JSON lines on stderr and, when `log_dir`
/// is given, the same lines in a rotating `invoicing.log` there.
///
/// stdout is left alone; the stdio transport owns it. Calling this twice is
/// harmless, the second subscriber is simply not installed.
pub fn init_logging(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let _ = tracing_log::LogTracer::init();

    let file_writer = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(rotating_file(dir)?);
            if let Ok(mut slot) = FILE_GUARD.lock() {
                *slot = Some(guard);
            }
            Some(writer)
        }
        None => None,
    };

    let stderr_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

/// Flush and close the file sink. Safe to call when none was installed.
pub fn flush_file_logging() {
    if let Ok(mut slot) = FILE_GUARD.lock() {
        slot.take();
    }
}
