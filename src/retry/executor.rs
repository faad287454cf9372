//! Bounded retry executor.
//!
//! A probe is invoked immediately and then once per poll interval until it reports a
//! terminal result or the policy's deadline passes. The executor holds no state across
//! calls, so independent waits can run concurrently on separate tasks.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Error;

/// Longest timeout a policy accepts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 86_400);

/// Timeout and poll interval for a single wait operation.
///
/// Both durations are positive, the interval is strictly smaller than the timeout, and the
/// timeout is at most [`MAX_TIMEOUT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    interval: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, Error> {
        if timeout.is_zero() || interval.is_zero() {
            return Err(Error::InvalidRetryPolicy(format!(
                "timeout ({timeout:?}) and interval ({interval:?}) must both be positive"
            )));
        }
        if interval >= timeout {
            return Err(Error::InvalidRetryPolicy(format!(
                "interval ({interval:?}) must be smaller than timeout ({timeout:?})"
            )));
        }
        if timeout > MAX_TIMEOUT {
            return Err(Error::InvalidRetryPolicy(format!(
                "timeout ({timeout:?}) exceeds the maximum of {MAX_TIMEOUT:?}"
            )));
        }
        Ok(Self { timeout, interval })
    }

    /// Built-in defaults only; callers guarantee `0 < interval < timeout`.
    pub(crate) const fn from_secs_unchecked(timeout: u64, interval: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout),
            interval: Duration::from_secs(interval),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of invocations a probe that never converges receives.
    pub fn max_attempts(&self) -> u32 {
        let timeout = self.timeout.as_nanos();
        let interval = self.interval.as_nanos();
        timeout.div_ceil(interval).min(u32::MAX as u128) as u32
    }
}

/// Result of a single probe invocation.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Reached an expected terminal state.
    Done(T),
    /// Not converged yet. `detail` describes what was observed.
    Pending {
        value: Option<T>,
        detail: Option<String>,
    },
    /// Reached an unexpected terminal state, or hit an error that must not be retried.
    Failed { value: Option<T>, error: Error },
}

impl<T> Attempt<T> {
    pub fn pending(detail: impl Into<String>) -> Self {
        Attempt::Pending {
            value: None,
            detail: Some(detail.into()),
        }
    }

    pub fn pending_with(value: T, detail: impl Into<String>) -> Self {
        Attempt::Pending {
            value: Some(value),
            detail: Some(detail.into()),
        }
    }

    pub fn failed(error: Error) -> Self {
        Attempt::Failed { value: None, error }
    }

    pub fn failed_with(value: T, error: Error) -> Self {
        Attempt::Failed {
            value: Some(value),
            error,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Attempt::Done(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Attempt::Pending { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Attempt::Failed { .. })
    }

    /// Replace the payload while keeping the classification.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Attempt::Done(v) => Attempt::Done(f(v)),
            Attempt::Pending { value, detail } => Attempt::Pending {
                value: value.map(f),
                detail,
            },
            Attempt::Failed { value, error } => Attempt::Failed {
                value: value.map(f),
                error,
            },
        }
    }
}

/// Why a wait ended without an expected terminal result.
///
/// Both variants keep the last value the probe produced.
#[derive(Debug)]
pub enum RetryError<T> {
    Failed { value: Option<T>, error: Error },
    TimedOut { value: Option<T>, error: Error },
}

impl<T> RetryError<T> {
    pub fn error(&self) -> &Error {
        match self {
            RetryError::Failed { error, .. } | RetryError::TimedOut { error, .. } => error,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            RetryError::Failed { value, .. } | RetryError::TimedOut { value, .. } => {
                value.as_ref()
            }
        }
    }

    pub fn into_parts(self) -> (Option<T>, Error) {
        match self {
            RetryError::Failed { value, error } | RetryError::TimedOut { value, error } => {
                (value, error)
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::TimedOut { .. })
    }
}

impl<T> fmt::Display for RetryError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error().fmt(f)
    }
}

impl<T: fmt::Debug> std::error::Error for RetryError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}

impl<T> From<RetryError<T>> for Error {
    fn from(err: RetryError<T>) -> Self {
        err.into_parts().1
    }
}

/// Poll `probe` until it converges, fails, or `policy` runs out of time.
///
/// The first invocation happens immediately. A further invocation is only scheduled when
/// it would start before the deadline, so a probe that never converges is invoked
/// `policy.max_attempts()` times (given negligible probe latency).
pub async fn retry_with_timeout<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut probe: F,
) -> Result<T, RetryError<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let start = Instant::now();
    // None means the deadline lies beyond what Instant can represent.
    let deadline = start.checked_add(policy.timeout);
    let mut attempts: u32 = 0;
    let mut last_value: Option<T> = None;
    let mut last_detail: Option<String> = None;

    loop {
        attempts += 1;
        match probe().await {
            Attempt::Done(value) => {
                info!(
                    %operation,
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Converged"
                );
                return Ok(value);
            }
            Attempt::Failed { value, error } => {
                warn!(%operation, attempts, %error, "Reached unexpected terminal state");
                return Err(RetryError::Failed { value, error });
            }
            Attempt::Pending { value, detail } => {
                if value.is_some() {
                    last_value = value;
                }
                if detail.is_some() {
                    last_detail = detail;
                }
            }
        }

        let next = Instant::now().checked_add(policy.interval);
        if let (Some(next), Some(deadline)) = (next, deadline) {
            if next >= deadline {
                break;
            }
        }

        debug!(
            %operation,
            attempt = attempts,
            detail = last_detail.as_deref().unwrap_or(""),
            next_retry_ms = policy.interval.as_millis() as u64,
            "Not converged, retrying"
        );
        tokio::time::sleep(policy.interval).await;
    }

    warn!(
        %operation,
        attempts,
        timeout_ms = policy.timeout.as_millis() as u64,
        detail = last_detail.as_deref().unwrap_or(""),
        "Timed out waiting for convergence"
    );
    Err(RetryError::TimedOut {
        value: last_value,
        error: Error::Timeout {
            operation: operation.to_string(),
            timeout: policy.timeout,
            attempts,
            last_detail,
        },
    })
}
