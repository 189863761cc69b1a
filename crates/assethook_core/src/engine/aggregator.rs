//! Merge per-service reports into one verdict.

use std::collections::BTreeMap;

use crate::models::{Message, ServiceReport, ValidationResult};

/// Flatten `reports` into a filename -> messages map.
///
/// Messages for one file keep report order first, then the order each
/// service returned them in. The result succeeds iff nothing was reported.
pub fn aggregate(reports: Vec<ServiceReport>) -> ValidationResult {
    let mut messages: BTreeMap<String, Vec<Message>> = BTreeMap::new();

    for report in reports {
        for message in report.messages {
            messages
                .entry(message.filename.clone())
                .or_default()
                .push(message);
        }
    }

    ValidationResult::from_messages(messages)
}
