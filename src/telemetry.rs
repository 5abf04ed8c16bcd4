//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: operation type (e.g. "ats_scoring", "resume_generation")
//! - `status`: outcome: "ok", "cached" or "error"
//! - `direction`: token direction: "prompt" or "completion"
//! - `limit`: which budget denied a call: "hourly", "daily" or "cost"

/// Total `execute` calls, including cache hits.
///
/// Labels: `operation`, `status` ("ok" | "cached" | "error").
pub const REQUESTS_TOTAL: &str = "muninn_requests_total";

/// Duration of `execute` calls that reached the upstream, in seconds.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "muninn_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "muninn_retries_total";

/// Total tokens consumed.
///
/// Labels: `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "muninn_tokens_total";

/// Accumulated estimated cost, in millionths of a monetary unit.
///
/// Labels: `model`.
pub const COST_MICROS_TOTAL: &str = "muninn_cost_micros_total";

/// Calls refused by the usage budget before reaching the upstream.
///
/// Labels: `limit`.
pub const BUDGET_DENIALS_TOTAL: &str = "muninn_budget_denials_total";

/// Total response cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total response cache misses.
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Entries evicted to make room for new ones.
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";
