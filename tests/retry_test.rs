use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use muninn::retry::{RetryConfig, with_retry, with_retry_and_timeout, with_timeout};
use muninn::{MuninnError, Result};
use tokio::time::Instant;

/// Operation that fails N times then succeeds.
struct FailThenSucceed {
    fail_count: AtomicU32,
    fail_with: fn() -> MuninnError,
    total_calls: AtomicU32,
}

impl FailThenSucceed {
    fn new(failures: u32, fail_with: fn() -> MuninnError) -> Self {
        Self {
            fail_count: AtomicU32::new(failures),
            fail_with,
            total_calls: AtomicU32::new(0),
        }
    }

    async fn call(&self) -> Result<&'static str> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let remaining = self.fail_count.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_count.fetch_sub(1, Ordering::Relaxed);
            return Err((self.fail_with)());
        }
        Ok("ok")
    }

    fn call_count(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

fn server_error() -> MuninnError {
    MuninnError::Api {
        status: 503,
        message: "service unavailable".into(),
    }
}

/// Paused-clock elapsed time, allowing for millisecond timer rounding.
fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

fn fast_config(max_retries: u32) -> RetryConfig {
    RetryConfig::new()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(1))
        .jitter(false)
}

#[tokio::test]
async fn retries_on_transient_error_then_succeeds() {
    let op = FailThenSucceed::new(2, server_error);

    let result = with_retry(&fast_config(3), "test", || op.call()).await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(op.call_count(), 3); // 2 failures + 1 success
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let op = FailThenSucceed::new(10, || MuninnError::Http("connection reset".into()));

    let result = with_retry(&fast_config(3), "test", || op.call()).await;

    assert!(matches!(result, Err(MuninnError::Http(_))));
    assert_eq!(op.call_count(), 4); // initial attempt + 3 retries
}

#[tokio::test]
async fn does_not_retry_permanent_errors() {
    let op = FailThenSucceed::new(1, || MuninnError::Api {
        status: 401,
        message: "invalid api key".into(),
    });

    let result = with_retry(&fast_config(3), "test", || op.call()).await;

    assert!(matches!(result, Err(MuninnError::Api { status: 401, .. })));
    assert_eq!(op.call_count(), 1);
}

#[tokio::test]
async fn zero_retries_means_single_attempt() {
    let op = FailThenSucceed::new(1, server_error);

    let result = with_retry(&RetryConfig::disabled(), "test", || op.call()).await;

    assert!(result.is_err());
    assert_eq!(op.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_attempts() {
    let op = FailThenSucceed::new(3, server_error);
    let config = RetryConfig::new()
        .initial_delay(Duration::from_secs(1))
        .max_delay(Duration::from_secs(10))
        .jitter(false);

    let start = Instant::now();
    let result = with_retry(&config, "test", || op.call()).await;

    assert!(result.is_ok());
    // 1s + 2s + 4s
    assert_elapsed(start, Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn backoff_is_capped_at_max_delay() {
    let op = FailThenSucceed::new(4, server_error);
    let config = RetryConfig::new()
        .max_retries(4)
        .initial_delay(Duration::from_secs(1))
        .max_delay(Duration::from_secs(3))
        .jitter(false);

    let start = Instant::now();
    with_retry(&config, "test", || op.call()).await.unwrap();

    // 1s + 2s + 3s (capped) + 3s (capped)
    assert_elapsed(start, Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn no_sleep_after_final_failure() {
    let op = FailThenSucceed::new(10, server_error);
    let config = RetryConfig::new()
        .max_retries(2)
        .initial_delay(Duration::from_secs(1))
        .jitter(false);

    let start = Instant::now();
    let _ = with_retry(&config, "test", || op.call()).await;

    // sleeps before retries 1 and 2 only
    assert_elapsed(start, Duration::from_secs(3));
}

#[tokio::test]
async fn on_retry_observer_sees_each_retry() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let config = fast_config(3).on_retry(move |attempt, err| {
        log.lock().unwrap().push((attempt, err.status()));
    });
    let op = FailThenSucceed::new(2, server_error);

    with_retry(&config, "test", || op.call()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, Some(503)), (2, Some(503))]);
}

#[tokio::test]
async fn custom_classifier_is_consulted() {
    // treat everything as terminal
    let config = fast_config(3).classifier(|_| false);
    let op = FailThenSucceed::new(1, server_error);

    let result = with_retry(&config, "test", || op.call()).await;

    assert!(result.is_err());
    assert_eq!(op.call_count(), 1);
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn timeout_fires_with_distinguished_error() {
    let result: Result<()> = with_timeout(
        async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(())
        },
        Duration::from_secs(60),
    )
    .await;

    match result {
        Err(MuninnError::Timeout { after }) => assert_eq!(after, Duration::from_secs(60)),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fast_operation_beats_timeout() {
    let result = with_timeout(async { Ok(42) }, Duration::from_secs(1)).await;
    assert_eq!(result.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn each_attempt_gets_its_own_timeout() {
    let calls = AtomicU32::new(0);
    let config = RetryConfig::new()
        .max_retries(2)
        .initial_delay(Duration::from_secs(1))
        .jitter(false);

    let result = with_retry_and_timeout(&config, Duration::from_secs(5), "test", || {
        let n = calls.fetch_add(1, Ordering::Relaxed);
        async move {
            // first two attempts hang, third answers immediately
            if n < 2 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(n)
        }
    })
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::Relaxed), 3);
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempts_exhaust_the_budget() {
    let calls = AtomicU32::new(0);
    let config = RetryConfig::new()
        .max_retries(1)
        .initial_delay(Duration::from_secs(1))
        .jitter(false);

    let start = Instant::now();
    let result: Result<()> = with_retry_and_timeout(&config, Duration::from_secs(5), "test", || {
        calls.fetch_add(1, Ordering::Relaxed);
        async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    })
    .await;

    assert!(matches!(result, Err(MuninnError::Timeout { .. })));
    assert_eq!(calls.load(Ordering::Relaxed), 2);
    // 5s attempt + 1s backoff + 5s attempt
    assert_elapsed(start, Duration::from_secs(11));
}
