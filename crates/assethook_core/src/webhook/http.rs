//! `reqwest`-backed webhook client.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::client::WebhookClient;
use super::errors::{WebhookError, WebhookResult};
use super::payload::{decode_response, WebhookRequest};
use crate::config::{default_max_response_bytes, HttpSettings};
use crate::context::Context;
use crate::models::{AssetWebhookService, Message};

/// Failure to construct the HTTP client.
#[derive(Error, Debug)]
#[error("Failed to build HTTP client: {0}")]
pub struct HttpClientError(#[from] reqwest::Error);

/// Sends one JSON `POST` per call and decodes the service's verdict.
#[derive(Debug, Clone)]
pub struct HttpWebhookClient {
    http: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpWebhookClient {
    /// Build a client from HTTP settings.
    pub fn new(settings: &HttpSettings) -> Result<Self, HttpClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            http,
            max_response_bytes: settings.max_response_bytes,
        })
    }

    /// Wrap an existing `reqwest` client (shared connection pool).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            max_response_bytes: default_max_response_bytes(),
        }
    }

    /// Cap the size of response bodies read from services.
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    async fn send(
        &self,
        service: &AssetWebhookService,
        asset_prefix: &str,
        files: &[String],
    ) -> WebhookResult<Vec<Message>> {
        let id = service.id();
        let url = service.url();
        let request = WebhookRequest {
            asset_prefix,
            files,
            metadata: service.metadata.as_ref(),
        };

        debug!("POST {} ({} files)", url, files.len());

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                WebhookError::processing(&id, format!("request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        let body = self.read_body(&id, response).await?;

        debug!("{} answered {}", id, status);
        decode_response(&id, status, &body, files)
    }

    /// Read the body chunk by chunk, giving up once it exceeds the limit.
    async fn read_body(
        &self,
        id: &str,
        mut response: reqwest::Response,
    ) -> WebhookResult<Vec<u8>> {
        let limit = self.max_response_bytes;
        let too_large =
            || WebhookError::processing(id, format!("response body exceeds {} bytes", limit));

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WebhookError::processing(id, format!("reading response failed: {}", e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn call(
        &self,
        ctx: &Context,
        service: &AssetWebhookService,
        asset_prefix: &str,
        files: &[String],
    ) -> WebhookResult<Vec<Message>> {
        if let Some(reason) = ctx.err() {
            return Err(WebhookError::interrupted(service.id(), reason));
        }

        tokio::select! {
            result = self.send(service, asset_prefix, files) => result,
            reason = ctx.done() => Err(WebhookError::interrupted(service.id(), reason)),
        }
    }
}
