//! Built-in provider table and the wire formats they speak.
//!
//! Adding a provider is a new `BuiltinProvider` entry; request and response
//! handling is selected by its `WireFormat`.

use super::{AuthStyle, ProviderSpec};
use crate::normalize::FieldPath;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Request/response shape a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// OpenAI-compatible `/chat/completions`.
    OpenAi,
    /// Anthropic `/v1/messages`.
    Anthropic,
    /// Google `generateContent`.
    Gemini,
    /// Cohere v2 `/chat`.
    Cohere,
    /// Flat `{"prompt": ...}` endpoints.
    Simple,
}

const OPENAI_PATHS: &[&str] = &[
    "choices.0.message.content",
    "choices.0.text",
    "output.text",
    "text",
    "result",
    "error.message",
];
const ANTHROPIC_PATHS: &[&str] = &["content.0.text", "completion", "error.message"];
const GEMINI_PATHS: &[&str] = &["candidates.0.content.parts.0.text", "error.message"];
const COHERE_PATHS: &[&str] = &["message.content.0.text", "text", "error.message"];
const SIMPLE_PATHS: &[&str] = &[
    "output.text",
    "text",
    "result",
    "response",
    "message",
    "error.message",
];

impl WireFormat {
    /// Field paths tried, in order, when no override is configured.
    pub fn default_field_paths(self) -> Vec<FieldPath> {
        let raw = match self {
            WireFormat::OpenAi => OPENAI_PATHS,
            WireFormat::Anthropic => ANTHROPIC_PATHS,
            WireFormat::Gemini => GEMINI_PATHS,
            WireFormat::Cohere => COHERE_PATHS,
            WireFormat::Simple => SIMPLE_PATHS,
        };
        raw.iter().map(|p| FieldPath::new(p)).collect()
    }

    /// Serialized request body asking `question`.
    pub fn build_body(self, model: &str, question: &str) -> Bytes {
        let body = match self {
            WireFormat::OpenAi | WireFormat::Cohere => json!({
                "model": model,
                "messages": [{"role": "user", "content": question}],
            }),
            WireFormat::Anthropic => json!({
                "model": model,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": question}],
            }),
            WireFormat::Gemini => json!({
                "contents": [{"parts": [{"text": question}]}],
            }),
            WireFormat::Simple => json!({
                "model": model,
                "prompt": question,
            }),
        };
        Bytes::from(body.to_string())
    }
}

/// Auth scheme of a built-in entry.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinAuth {
    Bearer,
    XApiKey,
    /// Raw key in the named header.
    Header(&'static str),
}

impl From<BuiltinAuth> for AuthStyle {
    fn from(auth: BuiltinAuth) -> Self {
        match auth {
            BuiltinAuth::Bearer => AuthStyle::Bearer,
            BuiltinAuth::XApiKey => AuthStyle::XApiKey,
            BuiltinAuth::Header(header) => AuthStyle::Custom {
                header: header.to_string(),
                value_prefix: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltinProvider {
    pub name: &'static str,
    /// May contain `{model}`.
    pub endpoint: &'static str,
    pub model: &'static str,
    pub wire: WireFormat,
    pub auth: BuiltinAuth,
    pub headers: &'static [(&'static str, &'static str)],
    /// Environment variable holding the credential.
    pub key_env: &'static str,
    /// Environment variable overriding the endpoint.
    pub endpoint_env: &'static str,
}

impl BuiltinProvider {
    /// Spec with built-in defaults and no credential.
    pub fn spec(&self) -> ProviderSpec {
        let endpoint = expand_endpoint(self.endpoint, self.model);
        let mut spec = ProviderSpec::new(self.name, &endpoint, self.wire)
            .with_model(self.model)
            .with_auth_style(self.auth.into());
        for (name, value) in self.headers {
            spec = spec.with_header(name, value);
        }
        spec
    }
}

/// Substitute `{model}` in an endpoint template.
pub fn expand_endpoint(template: &str, model: &str) -> String {
    template.replace("{model}", model)
}

static BUILTIN_PROVIDERS: &[BuiltinProvider] = &[
    BuiltinProvider {
        name: "openai",
        endpoint: "https://api.openai.com/v1/chat/completions",
        model: "gpt-4o-mini",
        wire: WireFormat::OpenAi,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "OPENAI_API_KEY",
        endpoint_env: "OPENAI_ENDPOINT",
    },
    BuiltinProvider {
        name: "anthropic",
        endpoint: "https://api.anthropic.com/v1/messages",
        model: "claude-3-5-haiku-latest",
        wire: WireFormat::Anthropic,
        auth: BuiltinAuth::XApiKey,
        headers: &[("anthropic-version", "2023-06-01")],
        key_env: "ANTHROPIC_API_KEY",
        endpoint_env: "ANTHROPIC_ENDPOINT",
    },
    BuiltinProvider {
        name: "gemini",
        endpoint: "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent",
        model: "gemini-2.0-flash",
        wire: WireFormat::Gemini,
        auth: BuiltinAuth::Header("x-goog-api-key"),
        headers: &[],
        key_env: "GEMINI_API_KEY",
        endpoint_env: "GEMINI_ENDPOINT",
    },
    BuiltinProvider {
        name: "mistral",
        endpoint: "https://api.mistral.ai/v1/chat/completions",
        model: "mistral-small-latest",
        wire: WireFormat::OpenAi,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "MISTRAL_API_KEY",
        endpoint_env: "MISTRAL_ENDPOINT",
    },
    BuiltinProvider {
        name: "deepseek",
        endpoint: "https://api.deepseek.com/chat/completions",
        model: "deepseek-chat",
        wire: WireFormat::OpenAi,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "DEEPSEEK_API_KEY",
        endpoint_env: "DEEPSEEK_ENDPOINT",
    },
    BuiltinProvider {
        name: "groq",
        endpoint: "https://api.groq.com/openai/v1/chat/completions",
        model: "llama-3.3-70b-versatile",
        wire: WireFormat::OpenAi,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "GROQ_API_KEY",
        endpoint_env: "GROQ_ENDPOINT",
    },
    BuiltinProvider {
        name: "xai",
        endpoint: "https://api.x.ai/v1/chat/completions",
        model: "grok-2-latest",
        wire: WireFormat::OpenAi,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "XAI_API_KEY",
        endpoint_env: "XAI_ENDPOINT",
    },
    BuiltinProvider {
        name: "perplexity",
        endpoint: "https://api.perplexity.ai/chat/completions",
        model: "sonar",
        wire: WireFormat::OpenAi,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "PERPLEXITY_API_KEY",
        endpoint_env: "PERPLEXITY_ENDPOINT",
    },
    BuiltinProvider {
        name: "cohere",
        endpoint: "https://api.cohere.com/v2/chat",
        model: "command-r-plus",
        wire: WireFormat::Cohere,
        auth: BuiltinAuth::Bearer,
        headers: &[],
        key_env: "COHERE_API_KEY",
        endpoint_env: "COHERE_ENDPOINT",
    },
];

/// All built-in providers, in default lineup order.
pub fn builtin_providers() -> &'static [BuiltinProvider] {
    BUILTIN_PROVIDERS
}

pub fn find_builtin(name: &str) -> Option<&'static BuiltinProvider> {
    BUILTIN_PROVIDERS.iter().find(|p| p.name == name)
}
