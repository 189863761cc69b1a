//! Error type for a single webhook call.

use thiserror::Error;

use crate::context::ContextError;

/// Why a webhook call produced no usable verdict.
///
/// Transport failures, bad status codes and undecodable bodies all collapse
/// into [`WebhookError::Processing`]: the caller only needs to know the
/// service's verdict is unknown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// The call could not be completed or its response was unusable.
    #[error("Webhook '{service}' processing error: {reason}")]
    Processing { service: String, reason: String },

    /// The run context stopped before the call finished.
    #[error("Webhook '{service}' interrupted: {source}")]
    Interrupted {
        service: String,
        #[source]
        source: ContextError,
    },
}

impl WebhookError {
    /// Create a processing error.
    pub fn processing(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create an interruption error.
    pub fn interrupted(service: impl Into<String>, source: ContextError) -> Self {
        Self::Interrupted {
            service: service.into(),
            source,
        }
    }

    /// Service the error belongs to.
    pub fn service(&self) -> &str {
        match self {
            Self::Processing { service, .. } | Self::Interrupted { service, .. } => service,
        }
    }

    /// The context error, if the call was interrupted.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Interrupted { source, .. } => Some(*source),
            Self::Processing { .. } => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.context_error().is_some()
    }
}

/// Result type for webhook calls.
pub type WebhookResult<T> = Result<T, WebhookError>;
