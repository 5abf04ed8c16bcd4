//! Retry configuration, delay calculation, and the retry/timeout helpers.
//!
//! [`with_retry`] re-runs an async operation on retryable failures with
//! capped exponential backoff plus jitter. [`with_timeout`] time-boxes a
//! single future. [`with_retry_and_timeout`] composes the two so that every
//! individual attempt gets its own time box: up to `max_retries + 1`
//! timeout-bounded attempts in total.
//!
//! Sleeping between attempts is a tokio timer, never a busy wait, so
//! concurrent callers keep making progress.

pub mod classify;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::{MuninnError, Result, telemetry};

pub use classify::DEFAULT_RETRYABLE_STATUS_CODES;

/// Custom retryability predicate, replacing [`classify::is_retryable`].
pub type RetryClassifier = Arc<dyn Fn(&MuninnError) -> bool + Send + Sync>;

/// Observer invoked before each retry with `(retry_number, error)`, where
/// `retry_number` starts at 1.
pub type RetryObserver = Arc<dyn Fn(u32, &MuninnError) + Send + Sync>;

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use muninn::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(200))
///     .backoff_multiplier(1.5);
/// ```
#[derive(Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt. 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Base delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 10s.
    pub max_delay: Duration,
    /// Growth factor applied per attempt. Default: 2.0.
    pub backoff_multiplier: f64,
    /// Whether to add up to 10% random jitter to delays. Default: true.
    pub jitter: bool,
    /// HTTP status codes treated as transient.
    /// Default: 408, 429, 500, 502, 503, 504.
    pub retryable_status_codes: Vec<u16>,
    classifier: Option<RetryClassifier>,
    on_retry: Option<RetryObserver>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
            classifier: None,
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("classifier", &self.classifier.as_ref().map(|_| "custom"))
            .field("on_retry", &self.on_retry.as_ref().map(|_| "set"))
            .finish()
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries after the initial attempt.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the per-attempt growth factor.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Replace the set of HTTP status codes treated as transient.
    pub fn retryable_status_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.retryable_status_codes = codes.into();
        self
    }

    /// Replace the default classifier with a custom predicate.
    pub fn classifier(mut self, f: impl Fn(&MuninnError) -> bool + Send + Sync + 'static) -> Self {
        self.classifier = Some(Arc::new(f));
        self
    }

    /// Observe retries. Purely advisory: the callback cannot alter control flow.
    pub fn on_retry(mut self, f: impl Fn(u32, &MuninnError) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Whether `err` should be retried under this config.
    ///
    /// Terminal errors are never retried, even by a custom classifier.
    pub fn is_retryable(&self, err: &MuninnError) -> bool {
        if err.is_terminal() {
            return false;
        }
        match &self.classifier {
            Some(classifier) => classifier(err),
            None => classify::is_retryable(err, &self.retryable_status_codes),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * multiplier^attempt`, capped
    /// at `max_delay`. Does NOT include jitter; see
    /// [`effective_delay()`](Self::effective_delay) for the full calculation.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let cap = self.max_delay.as_secs_f64();
        if secs.is_finite() && secs < cap {
            Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max_delay)
        } else {
            self.max_delay
        }
    }

    /// Add uniform random jitter in `[0, base * 0.1]` to a delay.
    ///
    /// Saturates at `Duration::MAX`, so an uncapped `max_delay` is safe.
    pub fn jittered(base: Duration) -> Duration {
        let spread = base.as_secs_f64() * 0.1;
        let extra = rand::thread_rng().gen_range(0.0..=spread);
        let extra = Duration::try_from_secs_f64(extra).unwrap_or(Duration::MAX);
        base.saturating_add(extra)
    }

    /// The delay actually slept before retry `attempt + 1`.
    pub fn effective_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.jitter {
            Self::jittered(delay)
        } else {
            delay
        }
    }
}

// ============================================================================
// Retry / timeout helpers
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Retryable failures (as classified by [`RetryConfig::is_retryable`]) are
/// retried up to `config.max_retries` times with exponential backoff. A
/// terminal failure, or the failure of the last allowed attempt, is returned
/// immediately without waiting.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match f().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };
        if attempt >= config.max_retries || !config.is_retryable(&err) {
            return Err(err);
        }

        let delay = config.effective_delay(attempt);
        metrics::counter!(telemetry::RETRIES_TOTAL, "operation" => operation.to_owned())
            .increment(1);
        if let Some(observer) = &config.on_retry {
            observer(attempt + 1, &err);
        }
        warn!(
            operation,
            attempt = attempt + 1,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying after transient error"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Race `fut` against a timer.
///
/// If the timer wins the future is dropped and a
/// [`MuninnError::Timeout`] is returned; whatever the abandoned call would
/// have produced is never observed.
pub async fn with_timeout<Fut, T>(fut: Fut, timeout: Duration) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| MuninnError::Timeout { after: timeout })?
}

/// [`with_retry`] where each attempt is individually bounded by `timeout`.
pub async fn with_retry_and_timeout<F, Fut, T>(
    config: &RetryConfig,
    timeout: Duration,
    operation: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry(config, operation, || with_timeout(f(), timeout)).await
}
