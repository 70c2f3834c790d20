//! Tracing subscriber setup.
//!
//! `debug` and `info` go to stdout, `warn` and `error` to stderr. `RUST_LOG`
//! takes precedence over the requested level when set.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Returned for a level string outside `debug|info|warn|error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}'")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(UnknownLogLevel(other.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

impl LogLevel {
    /// Whether this level logs to stderr rather than stdout.
    pub fn uses_stderr(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }

    /// Default `EnvFilter` directive for this crate at this level.
    pub fn directive(self) -> String {
        format!("multibin_demo={self},server={self},cli={self}")
    }
}

/// Install the global subscriber for `level`.
///
/// Unknown levels fall back to `info` and the fallback is logged once the
/// subscriber is up. Returns the level actually applied.
pub fn init(level: &str) -> Result<LogLevel, TryInitError> {
    let (applied, unknown) = match level.parse::<LogLevel>() {
        Ok(parsed) => (parsed, None),
        Err(e) => (LogLevel::Info, Some(e)),
    };

    let writer = if applied.uses_stderr() {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| applied.directive().into()),
        )
        .try_init()?;

    if let Some(e) = unknown {
        tracing::warn!("{}, defaulting to info", e);
    }
    if applied == LogLevel::Debug {
        tracing::debug!("Debug logging enabled");
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_levels() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("info".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Error));
    }

    #[test]
    fn test_parse_unknown_level() {
        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log level 'verbose'");
    }

    #[test]
    fn test_output_stream_split() {
        assert!(!LogLevel::Debug.uses_stderr());
        assert!(!LogLevel::Info.uses_stderr());
        assert!(LogLevel::Warn.uses_stderr());
        assert!(LogLevel::Error.uses_stderr());
    }

    #[test]
    fn test_directive_names_all_targets() {
        assert_eq!(
            LogLevel::Warn.directive(),
            "multibin_demo=warn,server=warn,cli=warn"
        );
    }

    #[test]
    fn test_init_falls_back_to_info() {
        // Only one global subscriber may be installed per test binary.
        assert_eq!(init("loud").unwrap(), LogLevel::Info);
        assert!(init("debug").is_err());
    }
}
