//! Render ordered results as labeled text blocks.

use crate::providers::sanitize::{redact, truncate_chars};
use crate::types::ProviderResult;
use serde_json::Value;
use std::borrow::Cow;

pub const NO_RESULT: &str = "(no result)";

const LOG_PREVIEW_CHARS: usize = 80;

/// What the report shows for `result`, before redaction: extracted text,
/// else the raw body (pretty-printed when it is JSON), else `(no result)`.
pub fn shown_text(result: &ProviderResult) -> String {
    if let Some(text) = &result.display_text {
        return text.clone();
    }
    match result.raw_body.as_deref() {
        Some(raw) if !raw.iter().all(u8::is_ascii_whitespace) => {
            match serde_json::from_slice::<Value>(raw) {
                Ok(value) => serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned()),
                Err(_) => String::from_utf8_lossy(raw).into_owned(),
            }
        }
        _ => NO_RESULT.to_string(),
    }
}

/// One labeled block for `result`.
///
/// Provider output is redacted. Failure payloads are built locally with an
/// already sanitized message, so their error codes are shown as they are.
pub fn render_block(result: &ProviderResult) -> String {
    let shown = shown_text(result);
    let shown = if result.status.is_success() {
        redact(&shown)
    } else {
        Cow::Borrowed(shown.as_str())
    };

    let preview = truncate_chars(&shown, LOG_PREVIEW_CHARS).replace('\n', " ");
    tracing::info!(
        provider = %result.provider,
        status = ?result.status,
        attempts = result.attempts,
        extracted = result.display_text.is_some(),
        preview = %preview,
        "presenting result"
    );

    format!("==== {} ====\n{}\n", result.provider, shown.trim_end())
}

/// The full report: one block per result, separated by blank lines.
pub fn render(results: &[ProviderResult]) -> String {
    results
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}
