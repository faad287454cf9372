mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use backup_harness::config::{HarnessConfig, WaitKind};
use backup_harness::retry::{retry_with_timeout, Attempt, RetryError, RetryPolicy, MAX_TIMEOUT};
use backup_harness::Error;

use common::policy;

#[tokio::test(start_paused = true)]
async fn test_done_on_first_attempt_does_not_sleep() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let value = assert_ok!(
        retry_with_timeout(&policy(60, 10), "immediate", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Attempt::Done("ready") }
        })
        .await
    );

    assert_eq!(value, "ready");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_never_converging_probe_gets_max_attempts() {
    for (timeout, interval) in [(60, 10), (100, 30), (90, 30), (2400, 30), (900, 60)] {
        let policy = policy(timeout, interval);
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = assert_err!(
            retry_with_timeout(&policy, "stuck", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Attempt::<()>::pending("still InProgress") }
            })
            .await
        );

        assert!(err.is_timeout());
        assert_eq!(
            calls.load(Ordering::SeqCst),
            policy.max_attempts(),
            "timeout {timeout}s, interval {interval}s"
        );
        assert!(start.elapsed() < policy.timeout());
        match err.error() {
            Error::Timeout {
                attempts,
                last_detail,
                ..
            } => {
                assert_eq!(*attempts, policy.max_attempts());
                assert_eq!(last_detail.as_deref(), Some("still InProgress"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_stops_immediately_with_value() {
    let calls = AtomicU32::new(0);

    let err = retry_with_timeout(&policy(60, 10), "doomed", || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Attempt::pending_with(n, "running")
            } else {
                Attempt::failed_with(
                    n,
                    Error::Precondition("backup was aborted".to_string()),
                )
            }
        }
    })
    .await
    .unwrap_err();

    assert!(matches!(err, RetryError::Failed { .. }));
    assert_eq!(err.value(), Some(&3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.error().reason(), "PreconditionFailed");
}

#[tokio::test(start_paused = true)]
async fn test_converges_on_kth_attempt() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let value = retry_with_timeout(&policy(60, 10), "converging", || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 4 {
                Attempt::Done(format!("attempt-{n}"))
            } else {
                Attempt::pending("waiting")
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(value, "attempt-4");
    assert_eq!(start.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_is_not_cancelled_at_deadline() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let err = retry_with_timeout(&policy(100, 10), "slow", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Attempt::<()>::pending("slow query")
        }
    })
    .await
    .unwrap_err();

    // Attempts start at 0s, 40s and 80s; the last one finishes past the deadline.
    assert!(err.is_timeout());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(110));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_last_reported_value() {
    let calls = AtomicU32::new(0);

    let err = retry_with_timeout(&policy(60, 10), "license", || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n % 2 == 0 {
                Attempt::pending_with(i64::from(n), "counted")
            } else {
                // Pending without a value must not clear the last one
                Attempt::pending("no reading")
            }
        }
    })
    .await
    .unwrap_err();

    // Six attempts: n = 0..=5, the last value reported was n = 4.
    assert_eq!(err.value(), Some(&4));
    let (value, error) = err.into_parts();
    assert_eq!(value, Some(4));
    assert!(error.to_string().ends_with(": no reading"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_executors_are_independent() {
    let mut set = JoinSet::new();
    let start = Instant::now();

    for k in 1..=10u32 {
        set.spawn(async move {
            let calls = Arc::new(AtomicU32::new(0));
            let probe_calls = Arc::clone(&calls);
            let result = retry_with_timeout(&policy(300, 10), &format!("wait-{k}"), move || {
                let n = probe_calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n >= k {
                        Attempt::Done(k)
                    } else {
                        Attempt::pending(format!("{n}/{k}"))
                    }
                }
            })
            .await;
            (k, result.map_err(|e| e.to_string()), calls.load(Ordering::SeqCst))
        });
    }

    let mut seen = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (k, result, calls) = joined.unwrap();
        assert_eq!(result, Ok(k));
        assert_eq!(calls, k);
        seen.push(k);
    }
    seen.sort();
    assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    // Waits overlap: total time is the slowest wait, not the sum.
    assert_eq!(start.elapsed(), Duration::from_secs(90));
}

#[test]
fn test_invalid_policies_are_rejected() {
    for (timeout, interval) in [(0, 0), (10, 0), (0, 10), (10, 10), (10, 20)] {
        let result = RetryPolicy::new(
            Duration::from_secs(timeout),
            Duration::from_secs(interval),
        );
        assert!(result.is_err(), "{timeout}s/{interval}s should be rejected");
    }
}

#[tokio::test(start_paused = true)]
async fn test_longest_policy_runs_without_overflow() {
    let policy = RetryPolicy::new(MAX_TIMEOUT, Duration::from_secs(10)).unwrap();
    let value = assert_ok!(
        retry_with_timeout(&policy, "long", || async { Attempt::Done(7) }).await
    );
    assert_eq!(value, 7);
}

#[test]
fn test_oversized_timeouts_rejected_at_config_load() {
    let yaml = r#"
timeouts:
  jobDeletion:
    timeout: 200000000000000d
    interval: 10s
"#;
    let err = HarnessConfig::from_yaml_str(yaml).unwrap_err();
    assert!(err.to_string().contains("exceeds the maximum"), "{err}");

    let yaml = r#"
timeouts:
  jobDeletion:
    timeout: 999999999999999999w
    interval: 10s
"#;
    assert!(HarnessConfig::from_yaml_str(yaml).is_err());

    let config = HarnessConfig::from_yaml_str("").unwrap();
    assert_eq!(config.policy(WaitKind::JobDeletion).timeout(), Duration::from_secs(300));
}
