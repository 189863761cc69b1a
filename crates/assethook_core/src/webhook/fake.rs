//! Table-driven fake client for tests.
//!
//! Each service id maps to a queue of stubbed outcomes; the last outcome
//! repeats once the queue is drained. Every call is recorded so tests can
//! assert the exact arguments the dispatcher used.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::client::WebhookClient;
use super::errors::{WebhookError, WebhookResult};
use crate::context::Context;
use crate::models::{AssetWebhookService, Message};

#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Messages(Vec<Message>),
    Fail(String),
    /// Never answers; only the context can end the call.
    Hang,
}

#[derive(Debug, Clone)]
pub(crate) struct Stub {
    pub delay: Duration,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub service: String,
    pub asset_prefix: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeWebhookClient {
    stubs: Arc<Mutex<HashMap<String, Vec<Stub>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeWebhookClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, service: &str, outcome: Outcome) -> Self {
        self.on_delayed(service, Duration::ZERO, outcome)
    }

    pub fn on_delayed(self, service: &str, delay: Duration, outcome: Outcome) -> Self {
        self.stubs
            .lock()
            .unwrap()
            .entry(service.to_string())
            .or_default()
            .push(Stub { delay, outcome });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, service: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.service == service)
            .count()
    }

    fn next_stub(&self, service: &str) -> Stub {
        let mut stubs = self.stubs.lock().unwrap();
        let queue = stubs
            .get_mut(service)
            .unwrap_or_else(|| panic!("no stub registered for {}", service));
        if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        }
    }
}

#[async_trait]
impl WebhookClient for FakeWebhookClient {
    async fn call(
        &self,
        ctx: &Context,
        service: &AssetWebhookService,
        asset_prefix: &str,
        files: &[String],
    ) -> WebhookResult<Vec<Message>> {
        let id = service.id();
        if let Some(reason) = ctx.err() {
            return Err(WebhookError::interrupted(id, reason));
        }

        self.calls.lock().unwrap().push(RecordedCall {
            service: id.clone(),
            asset_prefix: asset_prefix.to_string(),
            files: files.to_vec(),
        });
        let stub = self.next_stub(&id);

        let wait = async {
            match stub.outcome {
                Outcome::Hang => std::future::pending().await,
                _ => tokio::time::sleep(stub.delay).await,
            }
        };
        tokio::select! {
            _ = wait => {}
            reason = ctx.done() => return Err(WebhookError::interrupted(id, reason)),
        }

        match stub.outcome {
            Outcome::Messages(messages) => Ok(messages),
            Outcome::Fail(reason) => Err(WebhookError::processing(id, reason)),
            Outcome::Hang => unreachable!("hanging stub resolved"),
        }
    }
}
