//! Logging setup shared by all commands.

use clap::ValueEnum;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

impl LogLevel {
    /// Level selected by `--log-level`, falling back to `info` for `--verbose`.
    #[must_use]
    pub fn resolve(explicit: Option<Self>, verbose: bool) -> Self {
        explicit.unwrap_or(if verbose { Self::Info } else { Self::None })
    }

    const fn filter(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Error => Some("error"),
            Self::Warn => Some("warn"),
            Self::Info => Some("info"),
            Self::Debug => Some("debug"),
            Self::Trace => Some("trace"),
        }
    }
}

/// Initialize the logger for the given level. Logs go to stderr.
///
/// Only the first call in a process installs a logger.
pub fn init_logging(log_level: LogLevel) {
    let Some(level) = log_level.filter() else {
        return;
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
