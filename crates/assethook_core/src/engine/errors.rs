//! Error types for dispatch and validation.
//!
//! Errors carry context that chains through layers:
//! Validation → Dispatch → Webhook → Detail

use thiserror::Error;

use crate::context::ContextError;
use crate::webhook::{HttpClientError, WebhookError};

/// Failure of a fan-out over all services.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A service filter is not a valid regular expression.
    #[error("Invalid filter for webhook '{service}': {source}")]
    InvalidFilter {
        service: String,
        #[source]
        source: regex::Error,
    },

    /// A service failed and outstanding calls were cancelled.
    #[error("{0}")]
    ServiceFailed(#[source] WebhookError),

    /// One or more services failed after every service ran.
    #[error("{} webhook service(s) failed: {}", .failures.len(), summarize(.failures))]
    ServicesFailed { failures: Vec<WebhookError> },

    /// The run context stopped while calls were in flight.
    #[error("Dispatch interrupted: {0}")]
    Interrupted(#[source] ContextError),
}

impl DispatchError {
    /// Create an invalid filter error.
    pub fn invalid_filter(service: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidFilter {
            service: service.into(),
            source,
        }
    }

    /// The context error, if the dispatch was interrupted.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Interrupted(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Ids of the services whose calls failed.
    pub fn failed_services(&self) -> Vec<&str> {
        match self {
            Self::ServiceFailed(err) => vec![err.service()],
            Self::ServicesFailed { failures } => failures.iter().map(|e| e.service()).collect(),
            Self::InvalidFilter { service, .. } => vec![service.as_str()],
            Self::Interrupted(_) => Vec::new(),
        }
    }
}

fn summarize(failures: &[WebhookError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level validation error: validation could not run.
///
/// A run that completed and found problems is not an error; it is a
/// `ValidationResult` with `success == false`.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The webhook fan-out failed.
    #[error("Validation of asset '{asset}' could not complete: {source}")]
    Dispatch {
        asset: String,
        #[source]
        source: DispatchError,
    },

    /// The engine could not be set up.
    #[error("Validation engine setup failed: {0}")]
    Setup(#[from] HttpClientError),
}

impl ValidationError {
    /// Create a dispatch error for `asset`.
    pub fn dispatch(asset: impl Into<String>, source: DispatchError) -> Self {
        Self::Dispatch {
            asset: asset.into(),
            source,
        }
    }

    /// The context error, if the run was cancelled or timed out.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Dispatch { source, .. } => source.context_error(),
            Self::Setup(_) => None,
        }
    }

    /// Whether the run stopped because of cancellation or a deadline.
    ///
    /// Interrupted runs are worth retrying as a whole; processing errors
    /// usually point at a broken service.
    pub fn is_interrupted(&self) -> bool {
        self.context_error().is_some()
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for validation operations.
pub type ValidationOutcome<T> = Result<T, ValidationError>;
