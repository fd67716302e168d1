//! Subscriber setup for the binaries.
//!
//! The library only emits `tracing` events. Binaries call [`init_from_env`],
//! which honours `LOG_LEVEL` (trace, debug, info, warn, error) and
//! `LOG_FORMAT` (`json` or text). Output goes to stderr so stdout stays
//! machine-readable.

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Unknown names fall back to `Info`; `fatal` maps to `Error`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "warn" | "warning" => Level::Warn,
            "error" | "fatal" => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .map(|v| Self::from_name(&v))
            .unwrap_or(Level::Info)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::from_name(&v))
            .unwrap_or(LogFormat::Text)
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(level: Level, format: LogFormat) {
    let filter = EnvFilter::new(format!("deliveryscan={0},delivery_scan={0}", level.as_str()));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

pub fn init_from_env() {
    init(Level::from_env(), LogFormat::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(Level::from_name("DEBUG"), Level::Debug);
        assert_eq!(Level::from_name(" warning "), Level::Warn);
        assert_eq!(Level::from_name("fatal"), Level::Error);
        assert_eq!(Level::from_name("verbose"), Level::Info);
        assert!(Level::Trace < Level::Error);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("pretty"), LogFormat::Text);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(Level::Warn, LogFormat::Text);
        init(Level::Debug, LogFormat::Json);
    }
}
