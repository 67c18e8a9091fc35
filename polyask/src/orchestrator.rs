//! Concurrent fan-out of one question across the configured lineup.

use crate::executor::Executor;
use crate::providers::{LineupEntry, Transport};
use crate::types::{ProviderResult, ProviderStatus, RunSettings};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A lineup slot after launch: either already decided or running.
enum Slot {
    Ready(ProviderResult),
    Running {
        provider: String,
        handle: JoinHandle<ProviderResult>,
    },
}

#[derive(Clone)]
pub struct Orchestrator {
    executor: Arc<Executor>,
    stagger: Duration,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, settings: RunSettings) -> Self {
        let stagger = settings.stagger;
        Self {
            executor: Arc::new(Executor::new(transport, settings)),
            stagger,
        }
    }

    /// Ask every provider in `lineup` and return one result per entry, in
    /// lineup order, once all of them have finished.
    pub async fn run(&self, question: &str, lineup: &[LineupEntry]) -> Vec<ProviderResult> {
        let started = Instant::now();
        let question: Arc<str> = Arc::from(question);
        let mut slots = Vec::with_capacity(lineup.len());
        let mut launched = 0usize;

        for entry in lineup {
            let spec = match entry {
                LineupEntry::Provider(spec) => spec.clone(),
                LineupEntry::Unknown(name) => {
                    tracing::warn!(provider = %name, "unknown provider, not sending");
                    slots.push(Slot::Ready(ProviderResult::failure(
                        name.as_str(),
                        ProviderStatus::UnknownProvider,
                        None,
                        0,
                    )));
                    continue;
                }
            };

            // Spread launches out a little; earlier units keep running meanwhile.
            if launched > 0 && !self.stagger.is_zero() {
                tokio::time::sleep(self.stagger).await;
            }
            launched += 1;

            let provider = spec.name.clone();
            tracing::debug!(provider = %provider, "launching provider task");
            let executor = Arc::clone(&self.executor);
            let question = Arc::clone(&question);
            let handle = tokio::spawn(async move { executor.execute(&spec, &question).await });
            slots.push(Slot::Running { provider, handle });
        }

        let results = join_all(slots.into_iter().map(|slot| async move {
            match slot {
                Slot::Ready(result) => result,
                Slot::Running { provider, handle } => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(provider = %provider, error = %e, "provider task failed");
                        ProviderResult::failure(
                            provider,
                            ProviderStatus::TransportError,
                            Some("provider task failed unexpectedly"),
                            0,
                        )
                    }
                },
            }
        }))
        .await;

        let succeeded = results.iter().filter(|r| r.status.is_success()).count();
        tracing::info!(
            providers = results.len(),
            launched,
            succeeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fan-out complete"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderSpec;
    use crate::providers::registry::WireFormat;
    use crate::testing::{MockTransport, Reply};

    fn settings(stagger: Duration) -> RunSettings {
        RunSettings {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(20),
            stagger,
        }
    }

    fn url(name: &str) -> String {
        format!("https://{name}.test/ask")
    }

    fn provider(name: &str, key: Option<&str>) -> LineupEntry {
        LineupEntry::Provider(
            ProviderSpec::new(name, &url(name), WireFormat::Simple).with_auth_token(key),
        )
    }

    fn names(results: &[ProviderResult]) -> Vec<&str> {
        results.iter().map(|r| r.provider.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn results_follow_lineup_order_not_completion_order() {
        let mock = MockTransport::new()
            .script(&url("a"), vec![Reply::after(Duration::from_secs(3), Reply::ok(r#"{"text":"a"}"#))])
            .script(&url("b"), vec![Reply::after(Duration::from_secs(2), Reply::ok(r#"{"text":"b"}"#))])
            .script(&url("c"), vec![Reply::after(Duration::from_secs(1), Reply::ok(r#"{"text":"c"}"#))]);
        let orch = Orchestrator::new(Arc::new(mock), settings(Duration::ZERO));
        let lineup = vec![provider("a", Some("k")), provider("b", Some("k")), provider("c", Some("k"))];

        let results = orch.run("q", &lineup).await;
        assert_eq!(names(&results), ["a", "b", "c"]);
        let texts: Vec<_> = results.iter().map(|r| r.display_text.as_deref()).collect();
        assert_eq!(texts, [Some("a"), Some("b"), Some("c")]);
    }

    #[tokio::test(start_paused = true)]
    async fn units_run_concurrently_despite_stagger() {
        let slow = || vec![Reply::after(Duration::from_secs(5), Reply::ok(r#"{"text":"ok"}"#))];
        let mock = MockTransport::new()
            .script(&url("a"), slow())
            .script(&url("b"), slow())
            .script(&url("c"), slow());
        let orch = Orchestrator::new(Arc::new(mock), settings(Duration::from_millis(100)));
        let lineup = vec![provider("a", Some("k")), provider("b", Some("k")), provider("c", Some("k"))];

        let started = Instant::now();
        let results = orch.run("q", &lineup).await;
        let elapsed = started.elapsed();

        assert!(results.iter().all(|r| r.status.is_success()));
        assert!(elapsed >= Duration::from_millis(5200), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_provider_is_reported_without_a_request() {
        let mock = Arc::new(MockTransport::new().script(&url("a"), vec![Reply::ok(r#"{"text":"a"}"#)]));
        let orch = Orchestrator::new(mock.clone(), settings(Duration::ZERO));
        let lineup = vec![LineupEntry::Unknown("mystery".into()), provider("a", Some("k"))];

        let results = orch.run("q", &lineup).await;
        assert_eq!(names(&results), ["mystery", "a"]);
        assert_eq!(results[0].status, ProviderStatus::UnknownProvider);
        assert_eq!(results[1].status, ProviderStatus::Success);
        assert_eq!(mock.total_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_unit_is_contained() {
        let mock = MockTransport::new()
            .script(&url("a"), vec![Reply::Panic])
            .script(&url("b"), vec![Reply::ok(r#"{"text":"fine"}"#)]);
        let orch = Orchestrator::new(Arc::new(mock), settings(Duration::ZERO));
        let lineup = vec![provider("a", Some("k")), provider("b", Some("k"))];

        let results = orch.run("q", &lineup).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ProviderStatus::TransportError);
        let payload: serde_json::Value =
            serde_json::from_slice(results[0].raw_body.as_deref().unwrap()).unwrap();
        assert_eq!(payload["error"], "transport_error");
        assert_eq!(results[1].display_text.as_deref(), Some("fine"));
    }

    #[tokio::test(start_paused = true)]
    async fn every_configured_provider_gets_a_result_under_total_failure() {
        let mock = Arc::new(
            MockTransport::new()
                .script(&url("a"), vec![Reply::Fail("dns failure")])
                .script(&url("b"), vec![Reply::Status(500, "boom")]),
        );
        let orch = Orchestrator::new(mock.clone(), settings(Duration::from_millis(100)));
        let lineup = vec![
            provider("a", Some("k")),
            provider("b", Some("k")),
            provider("c", None),
            LineupEntry::Unknown("d".into()),
        ];

        let results = orch.run("q", &lineup).await;
        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                ProviderStatus::MaxRetriesExhausted,
                ProviderStatus::MaxRetriesExhausted,
                ProviderStatus::MissingCredential,
                ProviderStatus::UnknownProvider,
            ]
        );
        assert_eq!(mock.calls_to(&url("a")), 3);
        assert_eq!(mock.calls_to(&url("b")), 3);
        assert_eq!(mock.calls_to(&url("c")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ping_pong_scenario() {
        let mock = MockTransport::new().script(&url("A"), vec![Reply::ok(r#"{"text":"pong"}"#)]);
        let orch = Orchestrator::new(Arc::new(mock), settings(Duration::ZERO));
        let lineup = vec![provider("A", Some("secret")), provider("B", None)];

        let results = orch.run("ping", &lineup).await;
        assert_eq!(results[0].display_text.as_deref(), Some("pong"));
        assert_eq!(results[1].status, ProviderStatus::MissingCredential);
        let payload: serde_json::Value =
            serde_json::from_slice(results[1].raw_body.as_deref().unwrap()).unwrap();
        assert_eq!(payload, serde_json::json!({"error": "missing_api_key", "provider": "B"}));
    }

    #[tokio::test]
    async fn empty_lineup_yields_no_results() {
        let orch = Orchestrator::new(Arc::new(MockTransport::new()), settings(Duration::ZERO));
        assert!(orch.run("q", &[]).await.is_empty());
    }
}
