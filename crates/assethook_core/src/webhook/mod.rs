//! Webhook client: one call to one service for a batch of files.
//!
//! [`WebhookClient`] is the seam between the dispatcher and the network.
//! [`HttpWebhookClient`] is the production implementation; the wire format
//! lives in [`payload`].

mod client;
mod errors;
mod http;
pub mod payload;

#[cfg(test)]
pub(crate) mod fake;

pub use client::WebhookClient;
pub use errors::{WebhookError, WebhookResult};
pub use http::{HttpClientError, HttpWebhookClient};
pub use payload::{WebhookRequest, WebhookResponse};
