//! Reusable retry primitive: N attempts, exponential delay between them,
//! short-circuit on success, optional cancellation.
//!
//! The dispatcher drives notification delivery through [`retry_with_backoff`],
//! but nothing here knows about notifications; any fallible async operation
//! can be wrapped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;

/// Retry configuration shared by [`ExponentialBackoff`] and [`retry_with_backoff`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt ceiling, including the first attempt
    pub max_attempts: u32,
    /// Base delay; the delay before retry `n` is `base_delay * multiplier^n`
    pub base_delay: Duration,
    /// Multiplier for exponential growth
    pub multiplier: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Jitter factor (0.0 to 1.0); 0.0 keeps delays exact
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Delay inserted before retry `attempt` (counted from 1 for the first retry).
    ///
    /// With the default policy this yields 2s, then 4s.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let final_ms = if self.jitter_factor > 0.0 {
            let jitter_range = capped * self.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..jitter_range);
            (capped + jitter).max(1.0) as u64
        } else {
            capped.max(1.0) as u64
        };

        Duration::from_millis(final_ms)
    }
}

/// Stateful exponential backoff calculator.
///
/// Useful when the caller owns the loop and only needs the delay sequence.
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        self.policy.delay_for(self.attempt)
    }

    /// Reset the backoff to initial state
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Get the current attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Classification hook deciding whether a failed attempt may be retried.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Successful outcome of a retried operation.
#[derive(Debug)]
pub struct RetrySuccess<T> {
    pub value: T,
    /// Number of attempts actually made (1 when the first attempt succeeded)
    pub attempts: u32,
}

/// Failed outcome of a retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// All attempts failed, or a non-retryable error stopped the loop early.
    /// Carries the error from the last attempt made.
    Exhausted { attempts: u32, source: E },
    /// The cancel token fired before a terminal outcome.
    Cancelled { attempts: u32 },
}

/// Clonable cancellation signal for in-flight retry sequences.
///
/// Level-triggered: once cancelled, every current and future observer sees it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled. Never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                // Sender dropped without cancelling; park forever.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `operation` up to `policy.max_attempts` times with exponential backoff
/// between failures.
///
/// The operation receives the 1-based attempt number. Attempts are strictly
/// sequential: attempt n+1 never starts before attempt n has resolved and the
/// backoff delay has elapsed. The delay is a non-blocking `tokio::time::sleep`.
/// A `cancel` token, when provided, aborts both in-flight attempts and backoff
/// sleeps.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: Option<&CancelToken>,
    mut operation: F,
) -> Result<RetrySuccess<T>, RetryError<E>>
where
    E: Retryable,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    debug_assert!(policy.max_attempts >= 1);

    let mut backoff = ExponentialBackoff::new(policy.clone());
    let mut attempt = 0;
    loop {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
        }
        attempt += 1;

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                    result = operation(attempt) => result,
                }
            }
            None => operation(attempt).await,
        };

        let err = match result {
            Ok(value) => return Ok(RetrySuccess { value, attempts: attempt }),
            Err(err) => err,
        };

        if attempt >= policy.max_attempts || !err.is_retryable() {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                source: err,
            });
        }

        let delay = backoff.next_delay();
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn retryable() -> TestError {
        TestError { retryable: true }
    }

    #[test]
    fn test_delay_sequence_doubles_without_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_caps_at_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            multiplier: 10.0,
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.0,
        };
        assert_eq!(policy.delay_for(6), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            jitter_factor: 0.1,
            ..RetryPolicy::default()
        };
        for _ in 0..100 {
            let d = policy.delay_for(1).as_millis() as f64;
            assert!(d >= 1800.0 && d <= 2200.0, "delay {d}ms outside jitter band");
        }
    }

    #[test]
    fn test_backoff_calculator_advances_and_resets() {
        let mut backoff = ExponentialBackoff::new(RetryPolicy::default());
        let d1 = backoff.next_delay();
        let d2 = backoff.next_delay();
        assert!(d2 > d1);
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), d1);
    }

    #[tokio::test]
    async fn test_first_attempt_success_short_circuits() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&RetryPolicy::default(), None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(42) }
        })
        .await
        .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_backoff() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = retry_with_backoff(&RetryPolicy::default(), None, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(retryable())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s + 4s of backoff under paused time
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<RetrySuccess<()>, _> =
            retry_with_backoff(&RetryPolicy::default(), None, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(retryable()) }
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<RetrySuccess<()>, _> =
            retry_with_backoff(&RetryPolicy::default(), None, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: false }) }
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected exhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let token = CancelToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let result: Result<RetrySuccess<()>, _> =
            retry_with_backoff(&RetryPolicy::default(), Some(&token), |_| async {
                Err(retryable())
            })
            .await;

        match result {
            Err(RetryError::Cancelled { attempts }) => assert_eq!(attempts, 1),
            other => panic!("expected cancelled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_aborts_before_first_attempt() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());

        let calls = AtomicU32::new(0);
        let result: Result<RetrySuccess<()>, RetryError<TestError>> =
            retry_with_backoff(&RetryPolicy::default(), Some(&token), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        match result {
            Err(RetryError::Cancelled { attempts }) => assert_eq!(attempts, 0),
            other => panic!("expected cancelled, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
