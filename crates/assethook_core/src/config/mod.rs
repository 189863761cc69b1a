//! Configuration management for the validation engine.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Automatic defaults for missing keys
//!
//! # Example
//!
//! ```no_run
//! use assethook_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/assethook.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Timeout: {:?}", config.settings().dispatch.timeout());
//!
//! config.settings_mut().dispatch.max_in_flight = 4;
//! config.save().unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub(crate) use settings::default_max_response_bytes;
pub use settings::{
    DispatchSettings, FailurePolicy, HttpSettings, LoggingSettings, RetrySettings, Settings,
};
