//! Validation engine: the public entry point.

use tracing::{info, warn};

use super::aggregator::aggregate;
use super::dispatcher::Dispatcher;
use super::errors::{ValidationError, ValidationOutcome};
use crate::config::Settings;
use crate::context::Context;
use crate::models::{AssetWebhookService, ValidationResult};
use crate::webhook::{HttpWebhookClient, WebhookClient};

/// Runs an asset's files through its validation webhooks.
///
/// Holds no state between calls; one engine can serve concurrent runs.
pub struct ValidationEngine<C> {
    dispatcher: Dispatcher<C>,
}

impl ValidationEngine<HttpWebhookClient> {
    /// Create an engine talking HTTP to the services.
    pub fn new(settings: Settings) -> ValidationOutcome<Self> {
        let client = HttpWebhookClient::new(&settings.http)?;
        Ok(Self::with_client(client, settings))
    }
}

impl<C: WebhookClient> ValidationEngine<C> {
    /// Create an engine over any webhook client.
    pub fn with_client(client: C, settings: Settings) -> Self {
        Self {
            dispatcher: Dispatcher::new(client, settings.dispatch, settings.retry),
        }
    }

    /// The underlying webhook client.
    pub fn client(&self) -> &C {
        self.dispatcher.client()
    }

    /// Validate `files` of the asset identified by `asset_prefix`.
    ///
    /// `Ok` means every service answered: `success` tells whether any of
    /// them reported a problem. `Err` means the verdict is unknown; the
    /// caller should treat the asset as not validated.
    pub async fn validate(
        &self,
        ctx: &Context,
        asset_prefix: &str,
        files: &[String],
        services: &[AssetWebhookService],
    ) -> ValidationOutcome<ValidationResult> {
        let reports = self
            .dispatcher
            .dispatch(ctx, asset_prefix, files, services)
            .await
            .map_err(|e| {
                warn!("Validation of '{}' could not complete: {}", asset_prefix, e);
                ValidationError::dispatch(asset_prefix, e)
            })?;

        let result = aggregate(reports);
        if result.success {
            info!("Asset '{}' passed validation", asset_prefix);
        } else {
            info!(
                "Asset '{}' failed validation: {} message(s) for {} file(s)",
                asset_prefix,
                result.message_count(),
                result.messages.len()
            );
        }

        Ok(result)
    }
}
