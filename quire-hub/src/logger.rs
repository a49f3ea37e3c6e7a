//! Logging Infrastructure
//!
//! Console output by default; a daily rolling file under `LOG_DIR` when set.

use std::path::Path;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "quire-hub";

/// Initialize the logger with console output
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` takes precedence over `log_level` when present.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(appender) = log_dir.and_then(file_appender) {
        let _ = subscriber.with_ansi(false).with_writer(appender).try_init();
        return;
    }

    let _ = subscriber.try_init();
}

/// Daily rolling appender, `None` when the directory does not exist
fn file_appender(dir: &str) -> Option<RollingFileAppender> {
    let log_path = Path::new(dir);
    if !log_path.is_dir() {
        eprintln!("LOG_DIR {} does not exist, logging to console", dir);
        return None;
    }
    Some(tracing_appender::rolling::daily(log_path, LOG_FILE_PREFIX))
}
