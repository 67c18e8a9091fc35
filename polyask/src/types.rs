use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Run settings
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(100);

/// Tunables shared by every unit of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Attempts per provider, including the first one. Never below 1.
    pub max_attempts: u32,
    /// First retry waits this long; each later retry doubles it.
    pub base_backoff: Duration,
    /// Upper bound on a single HTTP attempt.
    pub timeout: Duration,
    /// Delay between launching successive units.
    pub stagger: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            timeout: DEFAULT_TIMEOUT,
            stagger: DEFAULT_STAGGER,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Terminal state of one provider unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Success,
    MissingCredential,
    TransportError,
    MaxRetriesExhausted,
    UnknownProvider,
}

impl ProviderStatus {
    /// Machine-readable code used in error payloads and log lines.
    pub fn code(self) -> &'static str {
        match self {
            ProviderStatus::Success => "ok",
            ProviderStatus::MissingCredential => "missing_api_key",
            ProviderStatus::TransportError => "transport_error",
            ProviderStatus::MaxRetriesExhausted => "max_retries_exhausted",
            ProviderStatus::UnknownProvider => "unknown_provider",
        }
    }

    pub fn is_success(self) -> bool {
        self == ProviderStatus::Success
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of asking one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    pub provider: String,
    pub status: ProviderStatus,
    /// Text extracted by the normalizer, if any field path matched.
    pub display_text: Option<String>,
    /// Response body on success, or a JSON error payload on failure.
    pub raw_body: Option<Bytes>,
    /// HTTP attempts actually made.
    pub attempts: u32,
    pub elapsed: Duration,
}

impl ProviderResult {
    pub fn success(
        provider: impl Into<String>,
        display_text: Option<String>,
        raw_body: Bytes,
        attempts: u32,
    ) -> Self {
        Self {
            provider: provider.into(),
            status: ProviderStatus::Success,
            display_text,
            raw_body: Some(raw_body),
            attempts,
            elapsed: Duration::ZERO,
        }
    }

    /// A failed result whose raw body is the `{error, provider, message?}` payload.
    pub fn failure(
        provider: impl Into<String>,
        status: ProviderStatus,
        message: Option<&str>,
        attempts: u32,
    ) -> Self {
        let provider = provider.into();
        let mut payload = json!({
            "error": status.code(),
            "provider": provider,
        });
        if let Some(message) = message {
            payload["message"] = json!(message);
        }
        Self {
            provider,
            status,
            display_text: None,
            raw_body: Some(Bytes::from(payload.to_string())),
            attempts,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}
