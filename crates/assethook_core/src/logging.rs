//! Logging setup built on the `tracing` ecosystem.
//!
//! The engine itself only emits `tracing` events. A binary embedding it
//! installs a subscriber once, usually through [`init_from_settings`] so the
//! `[logging]` section of the config file decides the verbosity.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Settings;

/// Verbosity used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Install the global subscriber at the level configured in `settings`.
pub fn init_from_settings(settings: &Settings) -> Result<(), TryInitError> {
    init_tracing(settings.logging.level)
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` directives take precedence over `default_level`. Fails if a
/// global subscriber is already set.
pub fn init_tracing(default_level: LogLevel) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter(default_level))
        .try_init()
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from(default_level).into())
        .from_env_lossy()
}

/// Warnings and above, captured by the test harness.
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
