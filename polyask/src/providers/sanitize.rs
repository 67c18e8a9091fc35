//! Redact token-like substrings and bound the length of error text before it
//! reaches a log line or the report.

use std::borrow::Cow;

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Runs of token characters at least this long are treated as secrets.
pub const MIN_TOKEN_LEN: usize = 20;

const MAX_API_ERROR_CHARS: usize = 200;

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

/// Replace every run of `MIN_TOKEN_LEN` or more token characters with
/// `[REDACTED]`. Shorter runs are left as they are.
pub fn redact(input: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut run_start: Option<usize> = None;

    // A trailing sentinel closes a run that reaches the end of input.
    for (i, c) in input.char_indices().chain(std::iter::once((input.len(), ' '))) {
        if is_token_char(c) {
            run_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = run_start.take() {
            if i - start >= MIN_TOKEN_LEN {
                out.push_str(&input[copied..start]);
                out.push_str(REDACTION_MARKER);
                copied = i;
            }
        }
    }

    if out.is_empty() {
        return Cow::Borrowed(input);
    }
    out.push_str(&input[copied..]);
    Cow::Owned(out)
}

/// Cut `input` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(input: &str, max_chars: usize) -> Cow<'_, str> {
    match input.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{}...", &input[..end])),
        None => Cow::Borrowed(input),
    }
}

/// Sanitize API error text by redacting secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let redacted = redact(input);
    truncate_chars(redacted.trim(), MAX_API_ERROR_CHARS).into_owned()
}

/// Build a sanitized provider error from a failed HTTP response body and status.
pub fn api_error_body(status: u16, body: &[u8]) -> super::ProviderError {
    super::ProviderError::Http {
        status,
        body: sanitize_api_error(&String::from_utf8_lossy(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_long_token_runs() {
        let key = "sk-proj-abcdefghijklmnopqrstuvwxyz012345";
        let line = format!("auth failed for key {key} on retry");
        assert_eq!(redact(&line), "auth failed for key [REDACTED] on retry");
    }

    #[test]
    fn leaves_short_runs_untouched() {
        let line = "HTTP error 429: rate_limit_exceeded for gpt-4o-mini";
        assert!(matches!(redact(line), Cow::Borrowed(_)));
        assert_eq!(redact(line), line);
    }

    #[test]
    fn threshold_is_inclusive() {
        let nineteen = "a".repeat(19);
        let twenty = "b".repeat(20);
        assert_eq!(redact(&nineteen), nineteen);
        assert_eq!(redact(&twenty), REDACTION_MARKER);
        assert_eq!(
            redact(&format!("{nineteen} {twenty}")),
            format!("{nineteen} {REDACTION_MARKER}")
        );
    }

    #[test]
    fn redacts_tokens_at_both_ends_and_inside_json() {
        let token = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let input = format!("{token}:{{\"token\":\"{token}\"}}:{token}");
        assert_eq!(
            redact(&input),
            "[REDACTED]:{\"token\":\"[REDACTED]\"}:[REDACTED]"
        );
    }

    #[test]
    fn non_ascii_breaks_runs() {
        let input = "abcdefghijéklmnopqrstu";
        assert_eq!(redact(input), input);
    }

    #[test]
    fn sanitize_truncates_after_redaction() {
        let long = "x ".repeat(300);
        let out = sanitize_api_error(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }

    #[test]
    fn api_error_body_scrubs_secrets() {
        let err = api_error_body(401, b"{\"error\":\"bad key sk-live-0123456789abcdefghijkl\"}");
        let msg = err.to_string();
        assert!(msg.starts_with("HTTP error 401"));
        assert!(msg.contains("[REDACTED]"));
        assert!(!msg.contains("0123456789abcdefghijkl"));
    }
}
