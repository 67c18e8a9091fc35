use std::collections::HashMap;
use std::str::FromStr;

pub const PROVIDERS_VAR: &str = "POLYASK_PROVIDERS";
pub const CONFIG_VAR: &str = "POLYASK_CONFIG";
pub const LOG_FILE_VAR: &str = "POLYASK_LOG_FILE";
pub const MAX_ATTEMPTS_VAR: &str = "POLYASK_MAX_ATTEMPTS";
pub const BACKOFF_VAR: &str = "POLYASK_BACKOFF_SECS";
pub const TIMEOUT_VAR: &str = "POLYASK_TIMEOUT_SECS";
pub const STAGGER_VAR: &str = "POLYASK_STAGGER_SECS";

/// Environment variables captured once at startup.
///
/// Resolution code reads from a snapshot instead of the live process
/// environment, so it can be exercised with explicit values.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value of `key`; blank values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parsed value of `key`. Unparseable values are logged and ignored.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(var = key, value = raw, "ignoring unparseable environment value");
                None
            }
        }
    }

    /// Comma-separated list in `key`, trimmed, blanks dropped.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        let raw = self.get(key)?;
        Some(split_list(raw))
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `<NAME>_<SUFFIX>` with the name upper-cased and non-alphanumerics mapped
/// to `_`, e.g. `local-llm` + `API_KEY` → `LOCAL_LLM_API_KEY`.
pub fn provider_var(name: &str, suffix: &str) -> String {
    let prefix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", prefix, suffix)
}

/// Resolve a credential. Resolution order:
/// 1. Explicit override (trimmed, ignored if empty)
/// 2. Provider environment variable
pub fn resolve_credential(env: &EnvSnapshot, env_var: &str, override_key: Option<&str>) -> Option<String> {
    if let Some(raw) = override_key {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_owned());
        }
    }
    env.get(env_var).map(str::to_owned)
}
