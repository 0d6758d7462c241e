//! Integration tests for the retry engine.
//!
//! Time is paused in every async test so backoff waits complete instantly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use firefly_client::{ClientError, ConfigError, ErrorKind, RetryConfig, RetryEngine};
use tokio_util::sync::CancellationToken;

fn engine(max_retries: u32) -> RetryEngine {
    RetryEngine::new(RetryConfig {
        max_retries,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(2),
        ..RetryConfig::default()
    })
    .unwrap()
}

#[test]
fn test_backoff_stays_within_bounds_for_every_attempt() {
    let config = RetryConfig {
        max_retries: 10,
        ..RetryConfig::default()
    };
    let upper = config.max_delay.mul_f64(1.1);

    for attempt in 0..=config.max_retries {
        let base = config.base_delay(attempt);
        for _ in 0..50 {
            let delay = config.calculate_backoff_delay(attempt);
            assert!(delay <= upper, "attempt {attempt}: {delay:?} > {upper:?}");
            assert!(delay >= base.mul_f64(0.9) - Duration::from_nanos(1));
            assert!(delay <= base.mul_f64(1.1) + Duration::from_nanos(1));
        }
    }
}

#[test]
fn test_backoff_grows_exponentially_until_capped() {
    let config = RetryConfig::default();
    assert_eq!(config.base_delay(0), Duration::from_secs(1));
    assert_eq!(config.base_delay(1), Duration::from_secs(2));
    assert_eq!(config.base_delay(2), Duration::from_secs(4));
    assert_eq!(config.base_delay(10), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failures_then_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result = engine(3)
        .run(&CancellationToken::new(), || {
            let counter = Arc::clone(&counter);
            async move {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                if call < 3 {
                    Err(ClientError::new(ErrorKind::Server, "unavailable").with_status(503))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_return_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let error = engine(2)
        .run(&CancellationToken::new(), || {
            let counter = Arc::clone(&counter);
            async move {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ClientError::new(ErrorKind::Network, format!("attempt {call}")))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(error.message(), "attempt 2");
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_failure_runs_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let error = engine(5)
        .run(&CancellationToken::new(), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ClientError::new(ErrorKind::NotFound, "no such account").with_status(404))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_never_invokes() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let error = engine(3)
        .run(&cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ClientError>(())
            }
        })
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_returns_cancelled() {
    let cancel = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let trigger = cancel.clone();

    let error = engine(3)
        .run(&cancel, || {
            let counter = Arc::clone(&counter);
            let trigger = trigger.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                Err::<(), _>(ClientError::new(ErrorKind::Timeout, "slow"))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_retryable_kinds() {
    let engine = RetryEngine::new(RetryConfig {
        max_retries: 1,
        retryable_kinds: [ErrorKind::Duplicate].into_iter().collect(),
        ..RetryConfig::default()
    })
    .unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let _ = engine
        .run(&CancellationToken::new(), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ClientError::new(ErrorKind::Duplicate, "exists"))
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_negative_backoff_factor_is_rejected_up_front() {
    let error = RetryEngine::new(RetryConfig {
        backoff_factor: -2.0,
        ..RetryConfig::default()
    })
    .unwrap_err();

    assert!(matches!(error, ConfigError::InvalidBackoffFactor { .. }));
}
