pub mod env;

pub use env::EnvSnapshot;

use crate::normalize::FieldPath;
use crate::providers::registry::{self, WireFormat, expand_endpoint, find_builtin};
use crate::providers::{LineupEntry, ProviderSpec};
use crate::types::{
    DEFAULT_BASE_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_STAGGER, DEFAULT_TIMEOUT, RunSettings,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration problems found while building the lineup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("provider {provider}: invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        provider: String,
        endpoint: String,
        reason: String,
    },
}

/// One provider entry in the config file. Either a bare name or a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProviderEntry")]
pub struct ProviderConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire: Option<WireFormat>,
    /// Replaces the wire format's default extraction order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_paths: Option<Vec<FieldPath>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderEntry {
    Name(String),
    Table {
        name: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        wire: Option<WireFormat>,
        #[serde(default)]
        response_paths: Option<Vec<FieldPath>>,
    },
}

impl From<ProviderEntry> for ProviderConfig {
    fn from(entry: ProviderEntry) -> Self {
        match entry {
            ProviderEntry::Name(name) => ProviderConfig {
                name,
                ..Default::default()
            },
            ProviderEntry::Table {
                name,
                endpoint,
                api_key,
                model,
                wire,
                response_paths,
            } => ProviderConfig {
                name,
                endpoint,
                api_key,
                model,
                wire,
                response_paths,
            },
        }
    }
}

/// The config file structure. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Lineup in order, with per-provider overrides.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_backoff_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stagger_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// Command-line values, which take precedence over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub providers: Option<Vec<String>>,
    pub max_attempts: Option<u32>,
    pub backoff_secs: Option<f64>,
    pub timeout_secs: Option<f64>,
    pub stagger_secs: Option<f64>,
    pub log_file: Option<PathBuf>,
}

/// First usable duration among `sources`, in precedence order. Negative and
/// non-finite values are skipped, and so is zero unless `allow_zero`.
fn secs(sources: [Option<f64>; 3], default: Duration, allow_zero: bool) -> Duration {
    sources
        .into_iter()
        .flatten()
        .filter(|v| *v > 0.0 || (allow_zero && *v == 0.0))
        .find_map(|v| Duration::try_from_secs_f64(v).ok())
        .unwrap_or(default)
}

/// Trimmed, non-blank string field of an optional provider entry.
fn file_field<'a>(
    file: Option<&'a ProviderConfig>,
    field: impl FnOnce(&'a ProviderConfig) -> Option<&'a String>,
) -> Option<&'a str> {
    file.and_then(field).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn validate_endpoint(provider: &str, endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        provider: provider.to_string(),
        endpoint: endpoint.to_string(),
        reason,
    };
    let parsed = url::Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

impl AppConfig {
    fn provider_config(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| normalize_name(&p.name) == name)
    }

    /// Tunables, by precedence: command line, environment, file, default.
    pub fn run_settings(&self, env: &EnvSnapshot, overrides: &Overrides) -> RunSettings {
        let max_attempts = overrides
            .max_attempts
            .or_else(|| env.parse(env::MAX_ATTEMPTS_VAR))
            .or(self.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1);
        RunSettings {
            max_attempts,
            base_backoff: secs(
                [overrides.backoff_secs, env.parse(env::BACKOFF_VAR), self.base_backoff_secs],
                DEFAULT_BASE_BACKOFF,
                true,
            ),
            timeout: secs(
                [overrides.timeout_secs, env.parse(env::TIMEOUT_VAR), self.timeout_secs],
                DEFAULT_TIMEOUT,
                false,
            ),
            stagger: secs(
                [overrides.stagger_secs, env.parse(env::STAGGER_VAR), self.stagger_secs],
                DEFAULT_STAGGER,
                true,
            ),
        }
    }

    /// Provider names in lineup order: command line, environment, file
    /// order, then every built-in. Lower-cased, first occurrence wins.
    pub fn lineup_names(&self, env: &EnvSnapshot, overrides: &Overrides) -> Vec<String> {
        let raw: Vec<String> = if let Some(list) = overrides.providers.clone().filter(|l| !l.is_empty()) {
            list
        } else if let Some(list) = env.list(env::PROVIDERS_VAR).filter(|l| !l.is_empty()) {
            list
        } else if !self.providers.is_empty() {
            self.providers.iter().map(|p| p.name.clone()).collect()
        } else {
            registry::builtin_providers()
                .iter()
                .map(|p| p.name.to_string())
                .collect()
        };

        let mut names: Vec<String> = Vec::with_capacity(raw.len());
        for name in raw.iter().map(|n| normalize_name(n)) {
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Resolve the lineup into provider specs (or unknown names).
    pub fn lineup(&self, env: &EnvSnapshot, overrides: &Overrides) -> Result<Vec<LineupEntry>, ConfigError> {
        self.lineup_names(env, overrides)
            .into_iter()
            .map(|name| self.resolve_provider(&name, env))
            .collect()
    }

    fn resolve_provider(&self, name: &str, env: &EnvSnapshot) -> Result<LineupEntry, ConfigError> {
        let file = self.provider_config(name);

        let spec = if let Some(builtin) = find_builtin(name) {
            let model = file_field(file, |p| p.model.as_ref()).unwrap_or(builtin.model);
            let template = file_field(file, |p| p.endpoint.as_ref())
                .or_else(|| env.get(builtin.endpoint_env))
                .unwrap_or(builtin.endpoint);
            let key = env::resolve_credential(env, builtin.key_env, file_field(file, |p| p.api_key.as_ref()));

            let mut spec = builtin.spec();
            spec.endpoint = expand_endpoint(template, model);
            spec.model = model.to_string();
            if let Some(wire) = file.and_then(|p| p.wire).filter(|w| *w != spec.wire) {
                spec.wire = wire;
                spec.field_paths = wire.default_field_paths();
            }
            spec.with_auth_token(key.as_deref())
        } else {
            let (Some(endpoint), Some(wire)) = (file_field(file, |p| p.endpoint.as_ref()), file.and_then(|p| p.wire)) else {
                tracing::warn!(provider = name, "not a built-in provider and no endpoint/wire configured");
                return Ok(LineupEntry::Unknown(name.to_string()));
            };
            let model = file_field(file, |p| p.model.as_ref()).unwrap_or_default();
            let key = env::resolve_credential(
                env,
                &env::provider_var(name, "API_KEY"),
                file_field(file, |p| p.api_key.as_ref()),
            );
            ProviderSpec::new(name, &expand_endpoint(endpoint, model), wire)
                .with_model(model)
                .with_auth_token(key.as_deref())
        };

        let spec = match file.and_then(|p| p.response_paths.clone()).filter(|p| !p.is_empty()) {
            Some(paths) => spec.with_field_paths(paths),
            None => spec,
        };

        validate_endpoint(name, &spec.endpoint)?;
        tracing::debug!(
            provider = name,
            endpoint = %spec.endpoint,
            model = %spec.model,
            has_credential = spec.credential().is_some(),
            "resolved provider"
        );
        Ok(LineupEntry::Provider(spec))
    }

    /// Log file, by precedence: command line, environment, file, default.
    pub fn log_file(&self, env: &EnvSnapshot, overrides: &Overrides) -> PathBuf {
        overrides
            .log_file
            .clone()
            .or_else(|| env.get(env::LOG_FILE_VAR).map(PathBuf::from))
            .or_else(|| self.log_file.clone())
            .unwrap_or_else(default_log_path)
    }
}

fn base_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".polyask")
}

/// `~/.polyask/polyask.log`
pub fn default_log_path() -> PathBuf {
    base_dir().join("polyask.log")
}

/// Locates and reads the config file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager with a custom path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a config manager with the default path (~/.polyask/config.json).
    pub fn default_path() -> Self {
        Self::new(base_dir().join("config.json"))
    }

    /// Explicit path, else `POLYASK_CONFIG`, else the default path.
    pub fn locate(explicit: Option<&Path>, env: &EnvSnapshot) -> Self {
        match explicit {
            Some(path) => Self::new(path),
            None => match env.get(env::CONFIG_VAR) {
                Some(path) => Self::new(path),
                None => Self::default_path(),
            },
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config from disk. Returns default if file doesn't exist.
    pub fn load(&self) -> anyhow::Result<AppConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config {}", self.path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", self.path.display()))?;
        Ok(cfg)
    }
}
