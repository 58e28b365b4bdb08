//! Logging setup for Keystone
//!
//! The container and the dispatcher emit structured `tracing` events. This
//! module re-exports the macros and installs a subscriber from a
//! [`LogConfig`]: JSON lines on STDOUT at INFO unless configured otherwise.
//!
//! ```no_run
//! use keystone_core::logging::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init()
//!     .expect("log output");
//!
//! info!("container ready");
//! ```
//!
//! # Environment Variables
//!
//! - `KEYSTONE_LOG_LEVEL=trace|debug|info|warn|error` - read by [`LogConfig::from_env`]
//! - `KEYSTONE_LOG_FORMAT=json|plain|pretty|compact` - read by [`LogConfig::from_env`]
//! - `RUST_LOG` - wins over the level when no explicit filter is set

use std::env;
use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{debug, debug_span, error, info, trace, warn};

const LEVEL_VAR: &str = "KEYSTONE_LOG_LEVEL";
const FORMAT_VAR: &str = "KEYSTONE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const NAMES: [(&'static str, LogLevel); 6] = [
        ("trace", LogLevel::Trace),
        ("debug", LogLevel::Debug),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("warning", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];

    /// Parse a level name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Directive understood by [`EnvFilter`]
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|(_, level)| *level)
            .ok_or_else(|| format!("unknown log level `{}`", s))
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

/// Line format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "plain" | "full" => LogFormat::Plain,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => return Err(format!("unknown log format `{}`", s)),
        };
        Ok(format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Appended to, created when missing
    File(PathBuf),
}

impl LogOutput {
    fn writer(&self) -> io::Result<(NonBlocking, WorkerGuard)> {
        Ok(match self {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                tracing_appender::non_blocking(file)
            }
        })
    }
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub thread_ids: bool,
    pub targets: bool,
    pub file_line: bool,
    pub colors: bool,
    /// Filter directives replacing `level`, e.g. `keystone_core=trace,info`
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            thread_ids: false,
            targets: true,
            file_line: false,
            colors: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `KEYSTONE_LOG_LEVEL` and `KEYSTONE_LOG_FORMAT`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let level = env::var(LEVEL_VAR).ok().and_then(|v| LogLevel::parse(&v));
        let format = env::var(FORMAT_VAR).ok().and_then(|v| LogFormat::parse(&v));

        let config = Self::default();
        Self {
            level: level.unwrap_or(config.level),
            format: format.unwrap_or(config.format),
            ..config
        }
    }

    pub fn level(self, level: LogLevel) -> Self {
        Self { level, ..self }
    }

    pub fn format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    pub fn output(self, output: LogOutput) -> Self {
        Self { output, ..self }
    }

    pub fn with_thread_ids(self, thread_ids: bool) -> Self {
        Self { thread_ids, ..self }
    }

    pub fn with_targets(self, targets: bool) -> Self {
        Self { targets, ..self }
    }

    pub fn with_file_line(self, file_line: bool) -> Self {
        Self { file_line, ..self }
    }

    pub fn with_colors(self, colors: bool) -> Self {
        Self { colors, ..self }
    }

    pub fn with_env_filter(self, filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..self
        }
    }

    /// Explicit directives first, then `RUST_LOG`, then the level
    fn filter(&self) -> EnvFilter {
        let parsed = match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives).ok(),
            None => EnvFilter::try_from_default_env().ok(),
        };
        parsed.unwrap_or_else(|| EnvFilter::new(self.level.directive()))
    }

    fn fmt_layer<S>(&self, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(self.targets)
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_line)
            .with_line_number(self.file_line)
            .with_ansi(self.colors);

        match self.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Plain => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }

    /// Install the global subscriber.
    ///
    /// Keep the returned guard alive for as long as logs should be written;
    /// dropping it flushes and stops the background writer. An already
    /// installed global subscriber is left in place.
    pub fn init(self) -> io::Result<WorkerGuard> {
        let (writer, guard) = self.output.writer()?;

        let installed = tracing_subscriber::registry()
            .with(self.filter())
            .with(self.fmt_layer(writer))
            .try_init();
        if installed.is_err() {
            debug!("global subscriber already installed, keeping it");
        }

        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(LogLevel::Error.to_string(), "error");
        assert!(LogLevel::Trace < LogLevel::Error);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::parse("Pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("full"), Some(LogFormat::Plain));
        assert!("xml".parse::<LogFormat>().unwrap_err().contains("xml"));
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::new()
            .level(LogLevel::Debug)
            .format(LogFormat::Compact)
            .output(LogOutput::File("app.log".into()))
            .with_colors(true)
            .with_targets(false)
            .with_env_filter("keystone_core=trace");

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.output, LogOutput::File(PathBuf::from("app.log")));
        assert!(config.colors);
        assert!(!config.targets);
        assert_eq!(config.env_filter.as_deref(), Some("keystone_core=trace"));
    }

    #[test]
    fn test_filter_directives() {
        let config = LogConfig::new().with_env_filter("keystone_core=trace");
        assert_eq!(config.filter().to_string(), "keystone_core=trace");

        // unparseable directives fall back to the level
        let config = LogConfig::new()
            .level(LogLevel::Warn)
            .with_env_filter("keystone_core=loudest");
        assert_eq!(config.filter().to_string(), "warn");
    }

    #[test]
    fn test_bad_log_file() {
        let config = LogConfig::new().output(LogOutput::File("/nonexistent/dir/app.log".into()));
        assert!(config.init().is_err());
    }
}
