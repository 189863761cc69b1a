//! Data types shared by the webhook client, dispatcher and aggregator.

mod message;
mod result;
mod service;

pub use message::Message;
pub use result::{ServiceReport, ValidationResult};
pub use service::AssetWebhookService;
