//! Per-service reports and the final validation verdict.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Raw messages returned by one service, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    /// Display id of the service (`namespace/name`).
    pub service: String,
    /// Messages in the order the service returned them.
    pub messages: Vec<Message>,
}

impl ServiceReport {
    pub fn new(service: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            service: service.into(),
            messages,
        }
    }
}

/// Final verdict of one validation run.
///
/// The default value is the "zero" result: `success == false` with no
/// messages. It is what a caller should assume when validation errored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff every service responded and none reported anything.
    pub success: bool,
    /// Diagnostics keyed by filename, ordered by filename.
    #[serde(default)]
    pub messages: BTreeMap<String, Vec<Message>>,
}

impl ValidationResult {
    /// Build a result from aggregated messages; success follows emptiness.
    pub fn from_messages(messages: BTreeMap<String, Vec<Message>>) -> Self {
        Self {
            success: messages.is_empty(),
            messages,
        }
    }

    /// Messages reported for `filename`, empty if it passed.
    pub fn messages_for(&self, filename: &str) -> &[Message] {
        self.messages
            .get(filename)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of messages across all files.
    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}
