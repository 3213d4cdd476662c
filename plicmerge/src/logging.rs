use std::env;
use std::io::Write;

use fern::Output;
use indicatif::{ProgressBar, WeakProgressBar};
use log::{debug, error, info};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::cli::VerbosityLevel;

/// Writer that suspends the current progress bar (if any) while writing log messages
#[derive(Debug)]
pub struct ProgressHandler<T: Write + Send>(T);

/// The progress bar of the running subcommand, log output is interleaved with its redraws
static CURRENT_PROGRESS_BAR: Lazy<RwLock<Option<WeakProgressBar>>> =
    Lazy::new(|| RwLock::new(None));

impl<T: Write + Send> ProgressHandler<T> {
    fn handle<F: FnOnce(&mut Self) -> R, R>(&mut self, inner_function: F) -> R {
        match get_progress_bar() {
            Some(pb) => pb.suspend(|| inner_function(self)),
            None => inner_function(self),
        }
    }

    pub fn new(pipe: T) -> Self {
        Self(pipe)
    }
}

impl<T: Write + Send + 'static> ProgressHandler<T> {
    pub fn into_output(self) -> Output {
        let boxed: Box<dyn Write + Send + 'static> = Box::new(self);
        boxed.into()
    }
}

impl<T: Write + Send> Write for ProgressHandler<T> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.handle(|this| this.0.write(buf))
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        self.handle(|this| this.0.flush())
    }
}

/// Sets the reference to the current ProgressBar for the writer
pub(crate) fn set_progress_bar(pb: Option<WeakProgressBar>) {
    *CURRENT_PROGRESS_BAR.write() = pb;
}

/// Returns the Progressbar, if it exists, otherwise "None"
pub(crate) fn get_progress_bar() -> Option<ProgressBar> {
    CURRENT_PROGRESS_BAR.read().as_ref()?.upgrade()
}

/// Prints an anyhow error and its full error chain using the log::error macro
pub(crate) fn log_error(err: &anyhow::Error) {
    error!("Error occurred: {}", err);
    err.chain()
        .skip(1)
        .for_each(|cause| error!("  caused by: {}", cause));
}

/// Parses a log level filter as given in the `RUST_LOG` env variable
fn parse_level_filter(level: &str) -> Option<log::LevelFilter> {
    match level.to_ascii_lowercase().as_str() {
        "off" => Some(log::LevelFilter::Off),
        "error" => Some(log::LevelFilter::Error),
        "warn" => Some(log::LevelFilter::Warn),
        "info" => Some(log::LevelFilter::Info),
        "debug" => Some(log::LevelFilter::Debug),
        "trace" => Some(log::LevelFilter::Trace),
        _ => None,
    }
}

/// Initializes logging with fern
///
/// Log messages are written to stderr so that the output of the `list` subcommand on stdout stays
/// machine readable. If a logger was already installed in this process, only its level is updated.
pub(crate) fn initialize_logging(
    verbosity: VerbosityLevel,
    quiet_mode: bool,
) -> Result<(), anyhow::Error> {
    let mut unknown_log_filter_level = None;
    let log_filter_level = if quiet_mode {
        log::LevelFilter::Off
    } else {
        verbosity.into_filter().unwrap_or_else(|| {
            if let Some(log_level) = env::var_os("RUST_LOG") {
                let log_level = log_level.to_string_lossy().into_owned();
                parse_level_filter(&log_level).unwrap_or_else(|| {
                    unknown_log_filter_level = Some(log_level);
                    log::LevelFilter::Info
                })
            } else {
                log::LevelFilter::Info
            }
        })
    };

    let applied = if matches!(verbosity, VerbosityLevel::None) {
        build_logger(log_filter_level, |out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                chrono::Local::now().format("%T%.3f"),
                record.level(),
                message
            ))
        })
    } else {
        build_logger(log_filter_level, |out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
                record.target(),
                record.level(),
                message
            ))
        })
    };

    if let Err(err) = applied {
        log::set_max_level(log_filter_level);
        debug!("Keeping previously installed logger ({})", err);
    }

    if let Some(filter_level) = unknown_log_filter_level {
        error!(
            "Unknown log filter level '{}' defined in 'RUST_LOG' env variable, using INFO instead.",
            filter_level
        );
    }

    Ok(())
}

fn build_logger<F>(
    log_filter_level: log::LevelFilter,
    formatter: F,
) -> Result<(), log::SetLoggerError>
where
    F: Fn(fern::FormatCallback, &std::fmt::Arguments, &log::Record) + Sync + Send + 'static,
{
    fern::Dispatch::new()
        .format(formatter)
        .level(log_filter_level)
        .chain(ProgressHandler::new(std::io::stderr()).into_output())
        .apply()
}

/// Prints program name, version etc. and command line arguments to log
pub(crate) fn log_program_info() {
    info!(
        "{} v{} ({})",
        env::args()
            .next()
            .unwrap_or_else(|| "plicmerge".to_string()),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_NAME")
    );

    let cmd_line = env::args().collect::<Vec<_>>().join(" ");
    info!("Called with command line: {}", cmd_line);
}
