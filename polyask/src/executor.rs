use crate::normalize::normalize;
use crate::providers::retry::RetryState;
use crate::providers::sanitize::{api_error_body, sanitize_api_error};
use crate::providers::{HttpRequest, ProviderError, ProviderSpec, Transport};
use crate::types::{ProviderResult, ProviderStatus, RunSettings};
use bytes::Bytes;
use std::sync::Arc;
use tokio::time::Instant;

/// Runs one provider's request with timeout and retry, producing its result.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    settings: RunSettings,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, settings: RunSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Ask `spec` the question. Never fails: every outcome is a `ProviderResult`.
    pub async fn execute(&self, spec: &ProviderSpec, question: &str) -> ProviderResult {
        let started = Instant::now();
        let provider = spec.name.as_str();

        let Some(request) = spec.build_request(question) else {
            tracing::warn!(provider, "no credential configured, skipping request");
            return ProviderResult::failure(provider, ProviderStatus::MissingCredential, None, 0)
                .with_elapsed(started.elapsed());
        };

        let mut state = RetryState::new(self.settings.max_attempts, self.settings.base_backoff);
        let mut last_error = None;

        while let Some(attempt) = state.begin() {
            match self.attempt(&request).await {
                Ok(body) => {
                    tracing::info!(
                        provider,
                        attempt,
                        bytes = body.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "request succeeded"
                    );
                    let text = normalize(provider, &body, &spec.field_paths);
                    if text.is_none() {
                        tracing::info!(provider, "no display text found, keeping raw body");
                    }
                    return ProviderResult::success(provider, text, body, attempt)
                        .with_elapsed(started.elapsed());
                }
                Err(e) => {
                    let detail = sanitize_api_error(&e.to_string());
                    match state.next_backoff() {
                        Some(wait) => {
                            tracing::warn!(
                                provider,
                                attempt,
                                max_attempts = state.max_attempts(),
                                backoff_ms = wait.as_millis() as u64,
                                error = %detail,
                                "request attempt failed, retrying"
                            );
                            tokio::time::sleep(wait).await;
                        }
                        None => {
                            tracing::warn!(
                                provider,
                                attempt,
                                max_attempts = state.max_attempts(),
                                error = %detail,
                                "request attempt failed, no attempts left"
                            );
                        }
                    }
                    last_error = Some(detail);
                }
            }
        }

        tracing::error!(provider, attempts = state.attempts(), "max retries exhausted");
        ProviderResult::failure(
            provider,
            ProviderStatus::MaxRetriesExhausted,
            last_error.as_deref(),
            state.attempts(),
        )
        .with_elapsed(started.elapsed())
    }

    /// One bounded HTTP exchange; non-2xx statuses are errors.
    async fn attempt(&self, request: &HttpRequest) -> Result<Bytes, ProviderError> {
        let timeout = self.settings.timeout;
        let resp = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| ProviderError::Timeout(timeout))??;

        if !resp.is_success() {
            return Err(api_error_body(resp.status, &resp.body));
        }
        Ok(resp.body)
    }
}
