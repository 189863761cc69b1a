//! Validation engine: dispatch, aggregation and the public facade.
//!
//! # Architecture
//!
//! ```text
//! ValidationEngine::validate
//!     ├── Dispatcher::dispatch   (filters, fan-out, timeout, retry)
//!     │     └── WebhookClient::call  x N services
//!     └── aggregate              (filename -> messages)
//! ```
//!
//! Two failure channels are kept apart:
//! - `Ok(ValidationResult { success: false, .. })` - services ran and
//!   reported problems
//! - `Err(ValidationError)` - the verdict is unknown (transport failure,
//!   bad response, cancellation)

mod aggregator;
mod dispatcher;
mod errors;
mod validation;

pub use aggregator::aggregate;
pub use dispatcher::Dispatcher;
pub use errors::{DispatchError, DispatchResult, ValidationError, ValidationOutcome};
pub use validation::ValidationEngine;
