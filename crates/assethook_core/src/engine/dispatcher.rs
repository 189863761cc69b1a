//! Concurrent fan-out of one validation run over all services.

use std::collections::HashSet;

use futures_util::stream::{self, StreamExt};
use regex::Regex;
use tracing::{debug, info, warn};

use super::errors::{DispatchError, DispatchResult};
use crate::config::{DispatchSettings, FailurePolicy, RetrySettings};
use crate::context::Context;
use crate::models::{AssetWebhookService, Message, ServiceReport};
use crate::webhook::{WebhookClient, WebhookError, WebhookResult};

/// Files selected for one service.
struct Batch<'a> {
    index: usize,
    service: &'a AssetWebhookService,
    files: Vec<String>,
}

/// Calls every service through a [`WebhookClient`] and collects raw reports.
///
/// Calls run concurrently up to `max_in_flight`. Each task hands its
/// `(index, result)` back to a single collecting loop, so the output is in
/// service order no matter which call finishes first.
pub struct Dispatcher<C> {
    client: C,
    settings: DispatchSettings,
    retry: RetrySettings,
}

impl<C: WebhookClient> Dispatcher<C> {
    pub fn new(client: C, settings: DispatchSettings, retry: RetrySettings) -> Self {
        Self {
            client,
            settings,
            retry,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run every applicable service for `files`.
    ///
    /// Returns one report per called service, in `services` order. An empty
    /// `services` list is a pass-through, not a failure.
    pub async fn dispatch(
        &self,
        ctx: &Context,
        asset_prefix: &str,
        files: &[String],
        services: &[AssetWebhookService],
    ) -> DispatchResult<Vec<ServiceReport>> {
        if services.is_empty() {
            debug!("No webhook services configured for '{}'", asset_prefix);
            return Ok(Vec::new());
        }
        if let Some(reason) = ctx.err() {
            return Err(DispatchError::Interrupted(reason));
        }

        let batches = self.plan_batches(files, services)?;
        info!(
            "Dispatching '{}' to {} of {} webhook service(s)",
            asset_prefix,
            batches.len(),
            services.len()
        );

        let mut slots: Vec<Option<Vec<Message>>> = vec![None; services.len()];
        let mut failures: Vec<(usize, WebhookError)> = Vec::new();

        let known: HashSet<&str> = files.iter().map(String::as_str).collect();
        let known = &known;

        let mut calls = stream::iter(batches)
            .map(|batch| async move {
                let result = self
                    .call_with_retry(ctx, asset_prefix, &batch)
                    .await
                    .and_then(|messages| check_filenames(batch.service, known, messages));
                (batch.index, result)
            })
            .buffer_unordered(self.settings.max_in_flight.max(1));

        loop {
            let next = tokio::select! {
                next = calls.next() => next,
                reason = ctx.done() => {
                    warn!("Dispatch for '{}' interrupted: {}", asset_prefix, reason);
                    return Err(DispatchError::Interrupted(reason));
                }
            };
            let Some((index, result)) = next else {
                break;
            };

            match result {
                Ok(messages) => {
                    debug!(
                        "{} returned {} message(s)",
                        services[index].id(),
                        messages.len()
                    );
                    slots[index] = Some(messages);
                }
                Err(err) => {
                    if let Some(reason) = err.context_error() {
                        return Err(DispatchError::Interrupted(reason));
                    }
                    warn!("{}", err);
                    match self.settings.failure_policy {
                        // Dropping `calls` cancels everything still in flight
                        FailurePolicy::FailFast => return Err(DispatchError::ServiceFailed(err)),
                        FailurePolicy::RunAll => failures.push((index, err)),
                    }
                }
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|(index, _)| *index);
            return Err(DispatchError::ServicesFailed {
                failures: failures.into_iter().map(|(_, err)| err).collect(),
            });
        }

        Ok(services
            .iter()
            .zip(slots)
            .filter_map(|(service, slot)| {
                slot.map(|messages| ServiceReport::new(service.id(), messages))
            })
            .collect())
    }

    /// Apply service filters and drop empty batches if configured to.
    ///
    /// Every filter is compiled before any call is made.
    fn plan_batches<'a>(
        &self,
        files: &[String],
        services: &'a [AssetWebhookService],
    ) -> DispatchResult<Vec<Batch<'a>>> {
        let mut batches = Vec::with_capacity(services.len());

        for (index, service) in services.iter().enumerate() {
            let selected: Vec<String> = match &service.filter {
                Some(pattern) => {
                    let filter = Regex::new(pattern)
                        .map_err(|e| DispatchError::invalid_filter(service.id(), e))?;
                    files.iter().filter(|f| filter.is_match(f)).cloned().collect()
                }
                None => files.to_vec(),
            };

            if selected.is_empty() && !self.settings.call_on_empty_batch {
                debug!("Skipping {}: no matching files", service.id());
                continue;
            }

            batches.push(Batch {
                index,
                service,
                files: selected,
            });
        }

        Ok(batches)
    }

    async fn call_with_retry(
        &self,
        ctx: &Context,
        asset_prefix: &str,
        batch: &Batch<'_>,
    ) -> WebhookResult<Vec<Message>> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.call_once(ctx, asset_prefix, batch).await {
                Ok(messages) => return Ok(messages),
                Err(err) => err,
            };
            if err.is_interrupted() || attempt >= attempts {
                return Err(err);
            }

            let delay = self.retry.backoff(attempt);
            warn!(
                "Attempt {}/{} failed ({}), retrying in {:?}",
                attempt, attempts, err, delay
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                reason = ctx.done() => {
                    return Err(WebhookError::interrupted(batch.service.id(), reason));
                }
            }
            attempt += 1;
        }
    }

    async fn call_once(
        &self,
        ctx: &Context,
        asset_prefix: &str,
        batch: &Batch<'_>,
    ) -> WebhookResult<Vec<Message>> {
        let call = self
            .client
            .call(ctx, batch.service, asset_prefix, &batch.files);
        let Some(timeout) = self.settings.timeout() else {
            return call.await;
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(WebhookError::processing(
                batch.service.id(),
                format!("timed out after {:?}", timeout),
            )),
        }
    }
}

/// Reject messages about files the caller never submitted.
///
/// With no input files there is nothing to check against, so asset-level
/// messages under any key are accepted.
fn check_filenames(
    service: &AssetWebhookService,
    known: &HashSet<&str>,
    messages: Vec<Message>,
) -> WebhookResult<Vec<Message>> {
    if known.is_empty() {
        return Ok(messages);
    }
    match messages.iter().find(|m| !known.contains(m.filename.as_str())) {
        Some(stray) => Err(WebhookError::processing(
            service.id(),
            format!("reported unknown file '{}'", stray.filename),
        )),
        None => Ok(messages),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::context::ContextError;
    use crate::webhook::fake::{FakeWebhookClient, Outcome, RecordedCall};

    fn service(name: &str) -> AssetWebhookService {
        AssetWebhookService::new(name, "ns", "/validate")
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn dispatcher(client: FakeWebhookClient) -> Dispatcher<FakeWebhookClient> {
        Dispatcher::new(client, DispatchSettings::default(), RetrySettings::default())
    }

    #[tokio::test]
    async fn empty_service_list_is_pass_through() {
        let dispatcher = dispatcher(FakeWebhookClient::new());

        let reports = dispatcher
            .dispatch(&Context::background(), "p", &files(&["a"]), &[])
            .await
            .unwrap();

        assert!(reports.is_empty());
        assert!(dispatcher.client().calls().is_empty());
    }

    #[tokio::test]
    async fn passes_exact_arguments_to_each_service() {
        let client = FakeWebhookClient::new()
            .on("ns/one", Outcome::Messages(Vec::new()))
            .on("ns/two", Outcome::Messages(Vec::new()));
        let dispatcher = dispatcher(client);

        dispatcher
            .dispatch(
                &Context::background(),
                "assets/docs",
                &files(&["a.md", "b.md"]),
                &[service("one"), service("two")],
            )
            .await
            .unwrap();

        let mut calls = dispatcher.client().calls();
        calls.sort_by(|a, b| a.service.cmp(&b.service));
        assert_eq!(
            calls,
            vec![
                RecordedCall {
                    service: "ns/one".to_string(),
                    asset_prefix: "assets/docs".to_string(),
                    files: files(&["a.md", "b.md"]),
                },
                RecordedCall {
                    service: "ns/two".to_string(),
                    asset_prefix: "assets/docs".to_string(),
                    files: files(&["a.md", "b.md"]),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reports_follow_service_order_not_completion_order() {
        let client = FakeWebhookClient::new()
            .on_delayed(
                "ns/slow",
                Duration::from_millis(300),
                Outcome::Messages(vec![Message::new("a", "slow")]),
            )
            .on_delayed(
                "ns/fast",
                Duration::from_millis(10),
                Outcome::Messages(vec![Message::new("a", "fast")]),
            );
        let dispatcher = dispatcher(client);

        let reports = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a"]),
                &[service("slow"), service("fast")],
            )
            .await
            .unwrap();

        let ids: Vec<&str> = reports.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(ids, vec!["ns/slow", "ns/fast"]);
    }

    #[tokio::test]
    async fn filter_restricts_the_batch() {
        let client = FakeWebhookClient::new().on("ns/yaml", Outcome::Messages(Vec::new()));
        let dispatcher = dispatcher(client);

        dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a.md", "spec.yaml", "b.yml"]),
                &[service("yaml").with_filter(r"\.ya?ml$")],
            )
            .await
            .unwrap();

        assert_eq!(
            dispatcher.client().calls()[0].files,
            files(&["spec.yaml", "b.yml"])
        );
    }

    #[tokio::test]
    async fn empty_batch_is_still_called_by_default() {
        let client = FakeWebhookClient::new().on("ns/yaml", Outcome::Messages(Vec::new()));
        let dispatcher = dispatcher(client);

        let reports = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a.md"]),
                &[service("yaml").with_filter(r"\.yaml$")],
            )
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert!(dispatcher.client().calls()[0].files.is_empty());
    }

    #[tokio::test]
    async fn filtered_out_service_cannot_report_unknown_files() {
        let client = FakeWebhookClient::new().on(
            "ns/yaml",
            Outcome::Messages(vec![Message::new("not-an-input", "stray")]),
        );
        let dispatcher = dispatcher(client);

        let err = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a.md"]),
                &[service("yaml").with_filter(r"\.yaml$")],
            )
            .await
            .unwrap_err();

        match err {
            DispatchError::ServiceFailed(WebhookError::Processing { service, reason }) => {
                assert_eq!(service, "ns/yaml");
                assert!(reason.contains("not-an-input"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn messages_for_submitted_files_are_kept() {
        let client = FakeWebhookClient::new().on(
            "ns/md",
            Outcome::Messages(vec![Message::new("b.md", "missing title")]),
        );
        let dispatcher = dispatcher(client);

        let reports = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a.md", "b.md"]),
                &[service("md")],
            )
            .await
            .unwrap();

        assert_eq!(reports[0].messages, vec![Message::new("b.md", "missing title")]);
    }

    #[tokio::test]
    async fn no_input_files_accepts_any_key() {
        let client = FakeWebhookClient::new().on(
            "ns/asset",
            Outcome::Messages(vec![Message::new("manifest", "missing")]),
        );
        let dispatcher = dispatcher(client);

        let reports = dispatcher
            .dispatch(&Context::background(), "p", &[], &[service("asset")])
            .await
            .unwrap();

        assert_eq!(reports[0].messages, vec![Message::new("manifest", "missing")]);
    }

    #[tokio::test(start_paused = true)]
    async fn max_in_flight_bounds_concurrent_calls() {
        async fn elapsed_with(max_in_flight: usize) -> Duration {
            let client = FakeWebhookClient::new()
                .on_delayed("ns/one", Duration::from_millis(100), Outcome::Messages(Vec::new()))
                .on_delayed("ns/two", Duration::from_millis(100), Outcome::Messages(Vec::new()));
            let settings = DispatchSettings {
                max_in_flight,
                ..DispatchSettings::default()
            };
            let dispatcher = Dispatcher::new(client, settings, RetrySettings::default());

            let start = tokio::time::Instant::now();
            let reports = dispatcher
                .dispatch(
                    &Context::background(),
                    "p",
                    &files(&["a"]),
                    &[service("one"), service("two")],
                )
                .await
                .unwrap();
            assert_eq!(reports.len(), 2);
            start.elapsed()
        }

        let serial = elapsed_with(1).await;
        assert!(serial >= Duration::from_millis(200), "{:?}", serial);
        assert!(serial < Duration::from_millis(300), "{:?}", serial);

        // Zero is clamped to one call at a time rather than stalling
        let clamped = elapsed_with(0).await;
        assert!(clamped >= Duration::from_millis(200), "{:?}", clamped);
        assert!(clamped < Duration::from_millis(300), "{:?}", clamped);

        let parallel = elapsed_with(2).await;
        assert!(parallel < Duration::from_millis(200), "{:?}", parallel);
    }

    #[tokio::test]
    async fn empty_batch_is_skipped_when_configured() {
        let client = FakeWebhookClient::new().on("ns/md", Outcome::Messages(Vec::new()));
        let settings = DispatchSettings {
            call_on_empty_batch: false,
            ..DispatchSettings::default()
        };
        let dispatcher = Dispatcher::new(client, settings, RetrySettings::default());

        let reports = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a.md"]),
                &[service("yaml").with_filter(r"\.yaml$"), service("md")],
            )
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].service, "ns/md");
        assert_eq!(dispatcher.client().call_count("ns/yaml"), 0);
    }

    #[tokio::test]
    async fn invalid_filter_fails_before_any_call() {
        let client = FakeWebhookClient::new().on("ns/ok", Outcome::Messages(Vec::new()));
        let dispatcher = dispatcher(client);

        let err = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a"]),
                &[service("ok"), service("broken").with_filter("(unclosed")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidFilter { .. }));
        assert!(dispatcher.client().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_returns_first_failure() {
        let client = FakeWebhookClient::new()
            .on("ns/broken", Outcome::Fail("connection refused".to_string()))
            .on("ns/stuck", Outcome::Hang);
        let dispatcher = dispatcher(client);

        let err = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["a"]),
                &[service("stuck"), service("broken")],
            )
            .await
            .unwrap_err();

        match err {
            DispatchError::ServiceFailed(inner) => assert_eq!(inner.service(), "ns/broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_all_reports_every_failure_in_service_order() {
        let client = FakeWebhookClient::new()
            .on("ns/a", Outcome::Fail("boom".to_string()))
            .on("ns/b", Outcome::Messages(vec![Message::new("x", "ignored")]))
            .on("ns/c", Outcome::Fail("bang".to_string()));
        let settings = DispatchSettings {
            failure_policy: FailurePolicy::RunAll,
            ..DispatchSettings::default()
        };
        let dispatcher = Dispatcher::new(client, settings, RetrySettings::default());

        let err = dispatcher
            .dispatch(
                &Context::background(),
                "p",
                &files(&["x"]),
                &[service("a"), service("b"), service("c")],
            )
            .await
            .unwrap_err();

        assert_eq!(err.failed_services(), vec!["ns/a", "ns/c"]);
        assert_eq!(dispatcher.client().call_count("ns/b"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_times_out_as_processing_error() {
        let client = FakeWebhookClient::new().on("ns/stuck", Outcome::Hang);
        let settings = DispatchSettings {
            timeout_secs: 2,
            ..DispatchSettings::default()
        };
        let dispatcher = Dispatcher::new(client, settings, RetrySettings::default());

        let err = dispatcher
            .dispatch(&Context::background(), "p", &[], &[service("stuck")])
            .await
            .unwrap_err();

        match err {
            DispatchError::ServiceFailed(WebhookError::Processing { reason, .. }) => {
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_lets_slow_service_finish() {
        let client = FakeWebhookClient::new().on_delayed(
            "ns/slow",
            Duration::from_secs(120),
            Outcome::Messages(Vec::new()),
        );
        let settings = DispatchSettings {
            timeout_secs: 0,
            ..DispatchSettings::default()
        };
        let dispatcher = Dispatcher::new(client, settings, RetrySettings::default());

        let reports = dispatcher
            .dispatch(&Context::background(), "p", &files(&["a"]), &[service("slow")])
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_still_honours_context_deadline() {
        let client = FakeWebhookClient::new().on("ns/stuck", Outcome::Hang);
        let settings = DispatchSettings {
            timeout_secs: 0,
            ..DispatchSettings::default()
        };
        let dispatcher = Dispatcher::new(client, settings, RetrySettings::default());
        let ctx = Context::background().with_timeout(Duration::from_secs(5));

        let err = dispatcher
            .dispatch(&ctx, "p", &files(&["a"]), &[service("stuck")])
            .await
            .unwrap_err();

        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_transient_failure() {
        let client = FakeWebhookClient::new()
            .on("ns/flaky", Outcome::Fail("503".to_string()))
            .on("ns/flaky", Outcome::Messages(vec![Message::new("a", "late")]));
        let retry = RetrySettings {
            max_attempts: 3,
            ..RetrySettings::default()
        };
        let dispatcher = Dispatcher::new(client, DispatchSettings::default(), retry);

        let reports = dispatcher
            .dispatch(&Context::background(), "p", &files(&["a"]), &[service("flaky")])
            .await
            .unwrap();

        assert_eq!(reports[0].messages, vec![Message::new("a", "late")]);
        assert_eq!(dispatcher.client().call_count("ns/flaky"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_reports_final_failure() {
        let client = FakeWebhookClient::new().on("ns/down", Outcome::Fail("503".to_string()));
        let retry = RetrySettings {
            max_attempts: 3,
            ..RetrySettings::default()
        };
        let dispatcher = Dispatcher::new(client, DispatchSettings::default(), retry);

        let err = dispatcher
            .dispatch(&Context::background(), "p", &files(&["a"]), &[service("down")])
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ServiceFailed(_)));
        assert_eq!(dispatcher.client().call_count("ns/down"), 3);
    }

    #[tokio::test]
    async fn cancelled_context_stops_in_flight_calls() {
        let client = FakeWebhookClient::new().on("ns/stuck", Outcome::Hang);
        let dispatcher = dispatcher(client);
        let (ctx, handle) = Context::with_cancel();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let err = dispatcher
            .dispatch(&ctx, "p", &files(&["a"]), &[service("stuck")])
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.context_error(), Some(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_reported_as_interruption() {
        let client = FakeWebhookClient::new().on("ns/stuck", Outcome::Hang);
        let dispatcher = dispatcher(client);
        let ctx = Context::background().with_timeout(Duration::from_secs(1));

        let err = dispatcher
            .dispatch(&ctx, "p", &files(&["a"]), &[service("stuck")])
            .await
            .unwrap_err();

        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
    }
}
