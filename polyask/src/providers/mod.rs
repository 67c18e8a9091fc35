pub mod registry;
pub mod retry;
pub mod sanitize;
pub mod transport;

use crate::normalize::FieldPath;
use async_trait::async_trait;
use bytes::Bytes;
use registry::WireFormat;
use std::time::Duration;

/// Errors from a single HTTP attempt.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// How the credential is sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
    /// Custom header name and value pattern (e.g. "Authorization" with "Bearer {key}")
    Custom { header: String, value_prefix: String },
}

impl AuthStyle {
    /// The header (name, value) carrying `key`.
    pub fn header(&self, key: &str) -> (String, String) {
        match self {
            AuthStyle::Bearer => ("Authorization".into(), format!("Bearer {}", key)),
            AuthStyle::XApiKey => ("x-api-key".into(), key.to_string()),
            AuthStyle::Custom { header, value_prefix } => {
                let value = if value_prefix.is_empty() {
                    key.to_string()
                } else if value_prefix.contains("{key}") {
                    value_prefix.replace("{key}", key)
                } else {
                    format!("{}{}", value_prefix, key)
                };
                (header.clone(), value)
            }
        }
    }
}

/// A fully-built POST request, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Status and body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request. Implementations do not retry; the executor owns that.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError>;
}

/// Everything needed to ask one provider a question.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSpec {
    pub name: String,
    pub endpoint: String,
    pub auth_token: Option<String>,
    pub auth_style: AuthStyle,
    /// Static headers sent with every request (e.g. API version pins).
    pub headers: Vec<(String, String)>,
    pub model: String,
    pub wire: WireFormat,
    /// Tried in order when extracting display text.
    pub field_paths: Vec<FieldPath>,
}

impl ProviderSpec {
    pub fn new(name: &str, endpoint: &str, wire: WireFormat) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.trim().to_string(),
            auth_token: None,
            auth_style: AuthStyle::Bearer,
            headers: Vec::new(),
            model: String::new(),
            wire,
            field_paths: wire.default_field_paths(),
        }
    }

    pub fn with_auth_token(mut self, token: Option<&str>) -> Self {
        self.auth_token = token.map(String::from);
        self
    }

    pub fn with_auth_style(mut self, style: AuthStyle) -> Self {
        self.auth_style = style;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_field_paths(mut self, paths: Vec<FieldPath>) -> Self {
        self.field_paths = paths;
        self
    }

    /// The credential, if present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// JSON body for `question` in this provider's wire format.
    pub fn request_body(&self, question: &str) -> Bytes {
        self.wire.build_body(&self.model, question)
    }

    /// The POST request for `question`, or `None` when no credential is configured.
    pub fn build_request(&self, question: &str) -> Option<HttpRequest> {
        let key = self.credential()?;
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.push(self.auth_style.header(key));
        headers.extend(self.headers.iter().cloned());
        Some(HttpRequest {
            url: self.endpoint.clone(),
            headers,
            body: self.request_body(question),
        })
    }
}

/// One slot of the configured lineup.
#[derive(Debug, Clone, PartialEq)]
pub enum LineupEntry {
    Provider(ProviderSpec),
    /// A configured name with no registry entry and no custom definition.
    Unknown(String),
}
