//! Webhook service descriptor.

use serde::{Deserialize, Serialize};

/// Descriptor of one external validation webhook.
///
/// Supplied fresh by the caller for every validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetWebhookService {
    /// Service name (also the in-cluster host name).
    pub name: String,
    /// Namespace the service is deployed in.
    pub namespace: String,
    /// Request path, or an absolute `http(s)://` URL.
    pub endpoint: String,
    /// Regular expression over filenames; only matching files are sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Service-specific parameters, forwarded untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AssetWebhookService {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            endpoint: endpoint.into(),
            filter: None,
            metadata: None,
        }
    }

    /// Set the filename filter (builder pattern).
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the opaque metadata (builder pattern).
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Identifier used in logs and errors.
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// URL the request is sent to.
    ///
    /// Absolute endpoints are used as-is; otherwise the service is addressed
    /// through cluster DNS.
    pub fn url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            return self.endpoint.clone();
        }

        let path = if self.endpoint.starts_with('/') || self.endpoint.is_empty() {
            self.endpoint.clone()
        } else {
            format!("/{}", self.endpoint)
        };

        format!(
            "http://{}.{}.svc.cluster.local{}",
            self.name, self.namespace, path
        )
    }
}
