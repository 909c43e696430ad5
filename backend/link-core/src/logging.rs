//! Process logging: colored stdout plus a plain-text log file.
//!
//! Thread-safe, idempotent initialization; calling twice logs a warning
//! and succeeds.

use crate::error::logging::LoggingError;

use common::ErrorLocation;

use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_ONCE: Once = Once::new();
static ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

const LOG_FILE_NAME: &str = "panel-link.log";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Initialize dual-output logging into `{log_dir}/panel-link.log`.
///
/// # Errors
///
/// Fails when the log file cannot be created or a logger is already set
/// by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), LoggingError> {
    if ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_ONCE.call_once(|| {
        result = initialize_dispatch(log_dir);
        if result.is_ok() {
            info!("Logger initialized with level {LOG_LEVEL:?}");
        }
    });

    result
}

fn initialize_dispatch(log_dir: &Path) -> Result<(), LoggingError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let colors = ColoredLevelConfig::new()
        .trace(Magenta)
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message}",
                date = format_rfc3339(SystemTime::now()),
                level = colors.color(record.level()),
                message = message,
            ))
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| LoggingError::File {
                location: ErrorLocation::from(Location::caller()),
                path: log_file_path.clone(),
                source: e,
            })?,
        );

    Dispatch::new()
        .level(LOG_LEVEL)
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| LoggingError::Init {
            location: ErrorLocation::from(Location::caller()),
            message: format!("Failed to apply logger configuration: {e}"),
        })
}
