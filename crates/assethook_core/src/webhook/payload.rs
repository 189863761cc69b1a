//! Wire format exchanged with webhook services.
//!
//! Request (`POST`, JSON):
//!
//! ```text
//! {"assetPrefix": "docs", "files": ["a.md"], "metadata": {...}}
//! ```
//!
//! Response (`2xx` or `422`, JSON, empty body allowed on `2xx`):
//!
//! ```text
//! {"messages": [{"filename": "a.md", "message": "missing title"}]}
//! ```

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::errors::{WebhookError, WebhookResult};
use crate::models::Message;

/// Request body sent to a webhook service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest<'a> {
    pub asset_prefix: &'a str,
    pub files: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a serde_json::Value>,
}

/// Response body returned by a webhook service.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WebhookResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Interpret a raw HTTP response for the batch `files`.
pub(crate) fn decode_response(
    service: &str,
    status: StatusCode,
    body: &[u8],
    files: &[String],
) -> WebhookResult<Vec<Message>> {
    let messages = if status.is_success() {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        parse_body(service, body)?
    } else if status == StatusCode::UNPROCESSABLE_ENTITY {
        let messages = parse_body(service, body)?;
        if messages.is_empty() {
            return Err(WebhookError::processing(
                service,
                "rejected the asset without any message",
            ));
        }
        messages
    } else {
        return Err(WebhookError::processing(
            service,
            format!("unexpected status {}", status.as_u16()),
        ));
    };

    // Asset-level checks run on an empty batch and may report under any key
    if !files.is_empty() {
        if let Some(stray) = messages.iter().find(|m| !files.contains(&m.filename)) {
            return Err(WebhookError::processing(
                service,
                format!("reported unknown file '{}'", stray.filename),
            ));
        }
    }

    Ok(messages)
}

fn parse_body(service: &str, body: &[u8]) -> WebhookResult<Vec<Message>> {
    serde_json::from_slice::<WebhookResponse>(body)
        .map(|response| response.messages)
        .map_err(|e| WebhookError::processing(service, format!("malformed response: {}", e)))
}
