//! Builds the root `slog::Logger` used across the whole process. One logger is constructed in
//! `main()` and cloned into every component; nothing recovers a logger from a global.

use slog::{Drain, Level, Logger};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            other => Err(format!("unknown log level: {other} (expected DEBUG or INFO)")),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Level {
        match level {
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
        }
    }
}

/// Construct an async, term-decorated root logger filtered at `level`.
pub fn root_logger(level: LogLevel) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level.into()).fuse();
    Logger::root(drain, slog::o!())
}

/// A logger that discards everything, for use in unit tests that don't want stderr noise.
pub fn test_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(LogLevel::from_str("debug").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("INFO").unwrap(), LogLevel::Info);
        assert!(LogLevel::from_str("TRACE").is_err());
    }
}
