//! Session logging
//!
//! Every line is written to stdout and to the session's log file, stamped with the seconds
//! elapsed since the session epoch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must be at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `target_levels` override `min_level` for the given log targets (module paths such as
/// `char_lib::drive::sim`), which lets noisy per-tick targets be quietened, or singled out for
/// trace, independently of the rest.
///
/// Can only be called once per process, a second call returns `FernInitError`.
pub fn logger_init(
    min_level: LevelFilter,
    target_levels: &[(&'static str, LevelFilter)],
    session: &Session,
) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let dispatch = target_levels.iter().fold(
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}",
                    format_line(
                        session::get_elapsed_seconds(),
                        record.level(),
                        record.target(),
                        message
                    )
                ))
            })
            .level(min_level),
        |d, &(target, level)| d.level_for(target, level),
    );

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {:?}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    for (target, level) in target_levels {
        info!("    Log level for {}: {:?}", target, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Render one log line. Only debug and trace lines carry the target.
fn format_line(elapsed_s: f64, level: Level, target: &str, message: &fmt::Arguments) -> String {
    if level > Level::Info {
        format!("[{:10.6} {}] {}: {}", elapsed_s, level_tag(level), target, message)
    }
    else {
        format!("[{:10.6} {}] {}", elapsed_s, level_tag(level), message)
    }
}

/// Three letter, coloured tag for a level.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}
