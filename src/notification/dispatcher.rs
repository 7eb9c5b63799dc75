use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::metrics::DispatchMetrics;
use crate::retry::{retry_with_backoff, CancelToken, RetryError, RetryPolicy};
use crate::transport::NotificationGateway;

use super::state::StateCell;
use super::{validate, NotificationRequest, RequestState, ValidationError};

/// Result of a successfully dispatched notification
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    /// Correlation id for this dispatch, also tagged on log records
    pub dispatch_id: Uuid,
    /// Delivery attempts made before the backend accepted (1..=3)
    pub attempts: u32,
}

/// Counters for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Total dispatch calls
    pub total_dispatched: AtomicU64,
    /// Dispatches confirmed by the backend
    pub total_fulfilled: AtomicU64,
    /// Dispatches rejected by local validation (no network call made)
    pub total_rejected: AtomicU64,
    /// Dispatches that exhausted the retry budget
    pub total_failed: AtomicU64,
    /// Dispatches aborted through a cancel token
    pub total_cancelled: AtomicU64,
    /// Network attempts across all dispatches
    pub delivery_attempts: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatched: self.total_dispatched.load(Ordering::Relaxed),
            total_fulfilled: self.total_fulfilled.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
            delivery_attempts: self.delivery_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_dispatched: u64,
    pub total_fulfilled: u64,
    pub total_rejected: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
    pub delivery_attempts: u64,
}

/// Orchestrates validation, delivery, retry and state transitions for
/// condition-based notification sends.
///
/// Constructed with an injected gateway so tests can substitute a fake
/// transport. The dispatcher exclusively owns the observable [`RequestState`];
/// callers read snapshots through [`NotificationDispatcher::state`].
///
/// Concurrent `dispatch` calls are serialized: one dispatch runs at a time,
/// later callers wait for the in-flight sequence (including its backoff
/// sleeps) to reach a terminal state, then overwrite the state snapshot.
pub struct NotificationDispatcher {
    gateway: Arc<dyn NotificationGateway>,
    retry: RetryPolicy,
    state: StateCell,
    in_flight: Mutex<()>,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    /// Create a dispatcher with the default retry policy (3 attempts, 2s/4s backoff).
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self::with_retry(gateway, RetryPolicy::default())
    }

    pub fn with_retry(gateway: Arc<dyn NotificationGateway>, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            retry,
            state: StateCell::default(),
            in_flight: Mutex::new(()),
            stats: DispatcherStats::default(),
        }
    }

    /// Snapshot of the current request state.
    pub fn state(&self) -> RequestState {
        self.state.snapshot()
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Validate and deliver one notification request.
    ///
    /// See [`NotificationDispatcher::dispatch_with_cancel`]; this variant
    /// cannot be aborted once started.
    pub async fn dispatch(
        &self,
        request: NotificationRequest,
        bearer_token: &str,
    ) -> Result<DispatchReceipt> {
        self.dispatch_with_cancel(request, bearer_token, None).await
    }

    /// Validate and deliver one notification request, observing `cancel`
    /// during network attempts and backoff sleeps.
    ///
    /// The state transitions pending -> fulfilled | rejected; `loading` is
    /// never left set after any outcome, cancellation included.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, request, bearer_token, cancel),
        fields(notification_type = %request.kind, send_all = request.send_all)
    )]
    pub async fn dispatch_with_cancel(
        &self,
        request: NotificationRequest,
        bearer_token: &str,
        cancel: Option<CancelToken>,
    ) -> Result<DispatchReceipt> {
        let _permit = self.in_flight.lock().await;

        let dispatch_id = Uuid::new_v4();
        let started = Instant::now();

        // Pending must be observable before any I/O or sleep happens.
        self.state.begin(request.clone());
        self.stats.total_dispatched.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_dispatched();

        if let Err(err) = validate(&request) {
            self.state.reject(err.to_string());
            self.stats.total_rejected.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_validation_rejected(validation_reason(&err));

            tracing::warn!(
                dispatch_id = %dispatch_id,
                error = %err,
                "notification request failed validation"
            );
            return Err(DispatchError::Validation(err));
        }

        let gateway = &self.gateway;
        let req = &request;
        let result = retry_with_backoff(&self.retry, cancel.as_ref(), |attempt| async move {
            tracing::debug!(dispatch_id = %dispatch_id, attempt, "delivering notification");
            gateway.deliver(req, bearer_token).await
        })
        .await;

        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(success) => {
                self.state.fulfill();
                self.stats.total_fulfilled.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .delivery_attempts
                    .fetch_add(success.attempts as u64, Ordering::Relaxed);
                DispatchMetrics::record_fulfilled(success.attempts, elapsed);

                tracing::info!(
                    dispatch_id = %dispatch_id,
                    attempts = success.attempts,
                    "notification accepted by backend"
                );
                Ok(DispatchReceipt {
                    dispatch_id,
                    attempts: success.attempts,
                })
            }
            Err(RetryError::Exhausted { attempts, source }) => {
                let message = source.surface_message();
                self.state.reject(message.clone());
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .delivery_attempts
                    .fetch_add(attempts as u64, Ordering::Relaxed);
                DispatchMetrics::record_delivery_failed(attempts, elapsed);

                tracing::error!(
                    dispatch_id = %dispatch_id,
                    attempts,
                    error = %source,
                    "notification delivery failed"
                );
                Err(DispatchError::Delivery { attempts, message })
            }
            Err(RetryError::Cancelled { attempts }) => {
                self.state.reject(DispatchError::Cancelled.to_string());
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .delivery_attempts
                    .fetch_add(attempts as u64, Ordering::Relaxed);
                DispatchMetrics::record_cancelled();

                tracing::warn!(
                    dispatch_id = %dispatch_id,
                    attempts,
                    "dispatch cancelled by caller"
                );
                Err(DispatchError::Cancelled)
            }
        }
    }
}

fn validation_reason(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::TitleRequired => "title",
        ValidationError::BodyRequired => "body",
        ValidationError::TargetingRequired => "targeting",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = DispatcherStats::default();
        stats.total_dispatched.fetch_add(4, Ordering::Relaxed);
        stats.total_fulfilled.fetch_add(3, Ordering::Relaxed);
        stats.delivery_attempts.fetch_add(7, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_dispatched, 4);
        assert_eq!(snapshot.total_fulfilled, 3);
        assert_eq!(snapshot.delivery_attempts, 7);
        assert_eq!(snapshot.total_failed, 0);
    }

    #[test]
    fn test_validation_reason_labels() {
        assert_eq!(validation_reason(&ValidationError::TitleRequired), "title");
        assert_eq!(validation_reason(&ValidationError::BodyRequired), "body");
        assert_eq!(
            validation_reason(&ValidationError::TargetingRequired),
            "targeting"
        );
    }
}
