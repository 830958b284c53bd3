use clap::ValueEnum;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig};

/// Accepted `LOG_LEVEL` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Install the global subscriber: `EnvFilter` from the configured level, RFC 3339 UTC
/// timestamps, compact or flattened JSON lines.
///
/// Only the first call installs anything.
pub fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let lines = fmt::layer().with_timer(UtcTime::rfc_3339());

    let _ = match cfg.format {
        // no ANSI codes, container log collectors keep them verbatim
        LogFormat::Json => registry
            .with(lines.json().flatten_event(true).with_ansi(false))
            .try_init(),
        LogFormat::Compact => registry
            .with(lines.compact().with_target(false).with_ansi(true))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_match_filter_directives() {
        for level in LogLevel::value_variants() {
            let value = level.to_possible_value().unwrap();
            assert_eq!(value.get_name(), level.as_str());
            assert!(EnvFilter::try_new(level.as_str()).is_ok());
        }
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!(LogLevel::from_str("WARN", true), Ok(LogLevel::Warn));
        assert!(LogLevel::from_str("verbose", true).is_err());
    }
}
