//! Parsers turning raw completion text into typed results.
//!
//! Parsing happens outside the retry boundary: every failure here is a
//! terminal [`MuninnError::InvalidResponse`].

use serde::de::DeserializeOwned;

use crate::{MuninnError, Result};

/// Trimmed text. Empty output is rejected.
pub fn text(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MuninnError::InvalidResponse(
            "model returned empty text".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Deserialize the outermost JSON object or array found in `raw`.
///
/// Models like to wrap JSON in Markdown fences or a sentence of preamble;
/// both are skipped.
pub fn json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let snippet = extract_json(raw).ok_or_else(|| {
        MuninnError::InvalidResponse("no JSON object found in model output".to_string())
    })?;
    serde_json::from_str(snippet)
        .map_err(|e| MuninnError::InvalidResponse(format!("malformed JSON: {e}")))
}

/// Slice of `raw` from the first `{`/`[` to its matching last `}`/`]`.
fn extract_json(raw: &str) -> Option<&str> {
    let body = strip_fences(raw.trim());
    let start = body.find(['{', '['])?;
    let close = if body[start..].starts_with('{') { '}' } else { ']' };
    let end = body.rfind(close)?;
    (end > start).then(|| &body[start..=end])
}

fn strip_fences(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    // drop the info string ("json", "JSON", ...) up to the first newline
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
