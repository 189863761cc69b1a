//! Webhook client trait definition.

use async_trait::async_trait;

use super::errors::WebhookResult;
use crate::context::Context;
use crate::models::{AssetWebhookService, Message};

/// One call to one webhook service for a batch of files.
///
/// The dispatcher only talks to services through this trait, so a fake
/// returning canned results can stand in for the network.
///
/// Implementations must:
///
/// 1. Return `WebhookError::Interrupted` without doing I/O if `ctx` has
///    already stopped
/// 2. Issue exactly one request; retries belong to the dispatcher
/// 3. Return an empty list when the service found no issues
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Submit `files` (possibly empty) under `asset_prefix` to `service`.
    async fn call(
        &self,
        ctx: &Context,
        service: &AssetWebhookService,
        asset_prefix: &str,
        files: &[String],
    ) -> WebhookResult<Vec<Message>>;
}
