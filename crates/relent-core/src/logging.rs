//! Global `tracing` subscriber setup for binaries and scripts driving a fit.

use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("A global logger is already installed")]
    AlreadyInitialized,
}

/// Installs a stderr logger, plus a plain-text file logger when `log_file` is given.
///
/// `verbosity` 0 shows warnings, 1 info, 2 debug and 3 or more trace events; `quiet`
/// silences everything.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<(), LoggingError> {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer);

    let installed = if let Some(path) = log_file {
        let file = File::create(&path).map_err(|e| LoggingError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(file_layer).try_init()
    } else {
        subscriber.try_init()
    };

    installed.map_err(|_| LoggingError::AlreadyInitialized)
}
