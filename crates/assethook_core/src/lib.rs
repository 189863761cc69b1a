//! AssetHook Core - validation webhook engine for uploaded assets
//!
//! Files belonging to an asset are submitted to a set of external webhook
//! services. The per-service diagnostics are merged into one verdict:
//!
//! ```text
//! ValidationEngine::validate
//!     └── Dispatcher        (bounded concurrent calls, timeout, retry)
//!           └── WebhookClient (one HTTP call per service)
//!     └── aggregate         (filename -> messages, success flag)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use assethook_core::config::Settings;
//! use assethook_core::context::Context;
//! use assethook_core::engine::ValidationEngine;
//! use assethook_core::logging::init_from_settings;
//! use assethook_core::models::AssetWebhookService;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! init_from_settings(&settings)?;
//!
//! let engine = ValidationEngine::new(settings)?;
//! let services = vec![AssetWebhookService::new("markdown-lint", "assets", "/validate")];
//! let files = vec!["docs/readme.md".to_string()];
//!
//! let result = engine
//!     .validate(&Context::background(), "docs", &files, &services)
//!     .await?;
//! println!("passed: {}", result.success);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod logging;
pub mod models;
pub mod webhook;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
