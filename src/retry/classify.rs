//! Retryability classification.
//!
//! The retry loop consults only [`is_retryable`]. The string heuristics are
//! inherently fragile; swapping them for structured error codes means
//! replacing this module, not touching the loop.

use crate::MuninnError;

/// Status codes retried by default: request timeout, too many requests and
/// the transient 5xx family.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Message fragments that indicate a network-level or timeout condition.
const NETWORK_MARKERS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "econnreset",
    "econnrefused",
    "connection reset",
    "connection refused",
];

/// Decide whether `err` may succeed on another attempt.
///
/// Retryable when the error:
/// - is a timeout or network-level failure,
/// - signals rate limiting (HTTP 429 or the phrase "rate limit"),
/// - carries an HTTP status in `retryable_status_codes`.
///
/// Errors that can never succeed on repetition (invalid responses, budget
/// denials, bad input or configuration) are terminal whatever their message
/// says.
pub fn is_retryable(err: &MuninnError, retryable_status_codes: &[u16]) -> bool {
    if err.is_terminal() {
        return false;
    }
    match err {
        MuninnError::Timeout { .. } | MuninnError::Http(_) => true,
        MuninnError::Api { status, .. }
            if *status == 429 || retryable_status_codes.contains(status) =>
        {
            true
        }
        _ => message_indicates_retryable(&err.to_string(), retryable_status_codes),
    }
}

/// Message-only half of the classifier.
///
/// Status codes are matched as substrings of the rendered message.
pub fn message_indicates_retryable(message: &str, retryable_status_codes: &[u16]) -> bool {
    let message = message.to_lowercase();
    NETWORK_MARKERS.iter().any(|marker| message.contains(marker))
        || message.contains("429")
        || message.contains("rate limit")
        || retryable_status_codes
            .iter()
            .any(|code| message.contains(&code.to_string()))
}
