//! Logger initialization backed by `log4rs`.
//!
//! Library crates only use the `log` macros. Binaries call [`init_logger`] once at
//! startup and tests call [`try_init_logger`].

mod appender;
mod consts;
mod logger;

pub use consts::{DEFAULT_LOGGER_ENV, ERR_LOG_FILE_NAME, LOG_FILE_NAME};
pub use logger::LogError;

use appender::AppenderSpec;
use log::LevelFilter;
use log4rs::{Config, config::Root};
use logger::Builder;
use std::iter::once;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Installs the global logger.
///
/// Lines are written to stderr and, when `log_dir` is given, to rolling log files
/// in that directory (one holding every line, one holding warnings and errors).
/// `filters` uses the `RUST_LOG` syntax, e.g. `info,kestrel_txscript=trace`, and
/// takes precedence over the `RUST_LOG` environment variable.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let stdout_appender = AppenderSpec::console(CONSOLE_APPENDER, None);
    let file_appender = log_dir.map(|dir| AppenderSpec::roller(LOG_FILE_APPENDER, None, dir, LOG_FILE_NAME)).transpose()?;
    let err_file_appender = log_dir
        .map(|dir| AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), dir, ERR_LOG_FILE_NAME))
        .transpose()?;
    let appenders: Vec<&'static str> =
        once(&stdout_appender).chain(file_appender.iter()).chain(err_file_appender.iter()).map(|x| x.name).collect();

    let loggers = Builder::new()
        .root_level(LevelFilter::Info)
        .appenders(appenders.iter().copied())
        .parse_env(DEFAULT_LOGGER_ENV)
        .parse_expression(filters)
        .build();

    let config = once(stdout_appender)
        .chain(file_appender)
        .chain(err_file_appender)
        .fold(Config::builder(), |config, appender| config.appender(appender.appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(appenders).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    log4rs::init_config(config).map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}

/// Tries to init the global logger, but does not panic if it was already setup.
/// Should be used for tests.
pub fn try_init_logger(filters: &str) {
    let _ = init_logger(None, filters);
}
