//! Log output setup
//!
//! Events go to stdout and to `telegram_bot.log` in the log directory. The
//! file is rolled over when it reaches [`MAX_LOG_FILE_BYTES`] or a new day
//! starts; at most [`MAX_LOG_FILES`] archives (`telegram_bot.log.1`, ...) are
//! kept. The file layer writes through a non-blocking worker; keep the
//! returned guard alive for the life of the process or buffered lines are
//! lost on exit.

use std::path::Path;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Error, Result};

/// Name of the active log file
pub const LOG_FILE_NAME: &str = "telegram_bot.log";

/// Size at which the active log file is rolled over
pub const MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Rolled-over files kept on disk
pub const MAX_LOG_FILES: usize = 10;

/// Filter directive for a `-v` count
#[must_use]
pub const fn filter_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info,telegram_grabber=info",
        1 => "info,telegram_grabber=debug",
        2 => "debug",
        _ => "trace",
    }
}

/// Size- and day-capped appender for `<log_dir>/telegram_bot.log`
///
/// # Errors
///
/// Returns error if the log directory or file cannot be created
pub fn file_appender(
    log_dir: &Path,
    max_bytes: u64,
    max_files: usize,
) -> Result<BasicRollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;

    let condition = RollingConditionBasic::new().daily().max_size(max_bytes);
    Ok(BasicRollingFileAppender::new(
        log_dir.join(LOG_FILE_NAME),
        condition,
        max_files,
    )?)
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flag when set.
///
/// # Errors
///
/// Returns error if the log file cannot be opened or a global subscriber is
/// already installed
pub fn init(verbose: u8, log_dir: &Path) -> Result<WorkerGuard> {
    let appender = file_appender(log_dir, MAX_LOG_FILE_BYTES, MAX_LOG_FILES)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    Ok(guard)
}
