//! Diagnostic message emitted by a webhook service.

use serde::{Deserialize, Serialize};

/// One diagnostic about one file.
///
/// There is no severity: a file with no messages passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// File the diagnostic refers to.
    pub filename: String,
    /// Plain text content.
    pub message: String,
}

impl Message {
    /// Create a new message.
    pub fn new(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            message: message.into(),
        }
    }
}
