//! services/assistant/src/retry.rs
//!
//! A generic retry-with-backoff combinator for transient network failures.
//!
//! The policy (attempt count, backoff curve, jitter ceiling) is separated from
//! the retried operation so the envelope can be tested with an injected jitter
//! source and a paused clock.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Bounded exponential-backoff policy for one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base unit of the backoff curve: the delay before attempt `k` (k >= 1)
    /// is `base_delay * 2^k` plus jitter. No delay before the first attempt.
    pub base_delay: Duration,
    /// Exclusive upper bound for the random jitter added to each delay.
    pub jitter_ceiling: Duration,
}

impl RetryPolicy {
    /// The policy used for completion-endpoint requests: 4 attempts, delays of
    /// 2s / 4s / 8s plus up to 500ms of jitter.
    pub fn transport_default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(1000),
            jitter_ceiling: Duration::from_millis(500),
        }
    }

    fn delay_before(&self, attempt: u32, jitter: Duration) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt) + jitter
    }
}

/// A jitter source drawing uniformly from `[0, ceiling)`.
pub fn random_jitter(ceiling: Duration) -> impl Fn() -> Duration {
    move || {
        if ceiling.is_zero() {
            return Duration::ZERO;
        }
        let nanos = rand::rng().random_range(0..ceiling.as_nanos() as u64);
        Duration::from_nanos(nanos)
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are exhausted.
///
/// The operation receives the 0-indexed attempt number. Every failure except
/// the one on the final attempt is swallowed and retried after the backoff
/// delay; the final failure is propagated unchanged.
pub async fn retry_with_backoff<T, E, F, Fut, J>(
    policy: &RetryPolicy,
    jitter: J,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    J: Fn() -> Duration,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_before(attempt, jitter())).await;
        }
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < policy.max_attempts => {
                warn!("Attempt {} of {} failed: {}", attempt + 1, policy.max_attempts, err);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_jitter() -> Duration {
        Duration::ZERO
    }

    /// An operation that fails `failures` times, then succeeds.
    fn flaky(failures: u32) -> (Arc<AtomicU32>, impl FnMut(u32) -> std::future::Ready<Result<&'static str, String>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let op = move |_attempt: u32| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                std::future::ready(Err(format!("boom {n}")))
            } else {
                std::future::ready(Ok("payload"))
            }
        };
        (calls, op)
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_has_no_delay() {
        let policy = RetryPolicy::transport_default();
        let start = tokio::time::Instant::now();
        let (calls, op) = flaky(0);
        let result = retry_with_backoff(&policy, no_jitter, op).await;
        assert_eq!(result, Ok("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_k_failures_with_k_plus_one_attempts() {
        let policy = RetryPolicy::transport_default();
        for failures in 1..4u32 {
            let (calls, op) = flaky(failures);
            let result = retry_with_backoff(&policy, no_jitter, op).await;
            assert_eq!(result, Ok("payload"));
            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_and_propagates_last_error() {
        let policy = RetryPolicy::transport_default();
        let start = tokio::time::Instant::now();
        let (calls, op) = flaky(u32::MAX);
        let result = retry_with_backoff(&policy, no_jitter, op).await;
        assert_eq!(result, Err("boom 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Delays of 2s, 4s, and 8s under a zero jitter source.
        assert_eq!(start.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_is_added_to_each_delay() {
        let policy = RetryPolicy::transport_default();
        let start = tokio::time::Instant::now();
        let (_, op) = flaky(1);
        let fixed_jitter = || Duration::from_millis(250);
        let result = retry_with_backoff(&policy, fixed_jitter, op).await;
        assert_eq!(result, Ok("payload"));
        assert_eq!(start.elapsed(), Duration::from_millis(2250));
    }

    #[test]
    fn random_jitter_stays_below_ceiling() {
        let jitter = random_jitter(Duration::from_millis(500));
        for _ in 0..100 {
            assert!(jitter() < Duration::from_millis(500));
        }
    }

    #[test]
    fn random_jitter_with_zero_ceiling_is_zero() {
        let jitter = random_jitter(Duration::ZERO);
        assert_eq!(jitter(), Duration::ZERO);
    }
}
