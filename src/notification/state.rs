//! Request lifecycle state observed by callers.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::NotificationRequest;

/// Snapshot of the most recent dispatch's lifecycle.
///
/// Lifecycle: rest -> pending -> fulfilled | rejected. The state is
/// overwritten by each dispatch call, never accumulated; only one request's
/// outcome is tracked at a time.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    /// True strictly between dispatch start and the terminal outcome
    pub loading: bool,
    /// True only after confirmed backend acceptance
    pub success: bool,
    /// Set only on terminal failure (validation or exhausted retries)
    pub error: Option<String>,
    /// Most recently attempted request, retained for diagnostics
    pub last_request: Option<NotificationRequest>,
    /// When the last transition happened
    pub updated_at: Option<DateTime<Utc>>,
}

impl RequestState {
    /// Whether the state is at rest or terminal (no dispatch in flight).
    pub fn is_terminal(&self) -> bool {
        !self.loading
    }
}

/// Dispatcher-owned cell holding the observable [`RequestState`].
///
/// Only the dispatcher writes; observers get clones via [`StateCell::snapshot`].
#[derive(Debug, Default)]
pub(crate) struct StateCell {
    inner: RwLock<RequestState>,
}

impl StateCell {
    pub(crate) fn snapshot(&self) -> RequestState {
        self.inner.read().expect("state lock poisoned").clone()
    }

    /// Transition to pending and record the request being attempted.
    pub(crate) fn begin(&self, request: NotificationRequest) {
        let mut state = self.inner.write().expect("state lock poisoned");
        *state = RequestState {
            loading: true,
            success: false,
            error: None,
            last_request: Some(request),
            updated_at: Some(Utc::now()),
        };
    }

    /// Transition to the fulfilled terminal state.
    pub(crate) fn fulfill(&self) {
        let mut state = self.inner.write().expect("state lock poisoned");
        state.loading = false;
        state.success = true;
        state.error = None;
        state.updated_at = Some(Utc::now());
    }

    /// Transition to the rejected terminal state with a human-readable reason.
    pub(crate) fn reject(&self, message: String) {
        let mut state = self.inner.write().expect("state lock poisoned");
        state.loading = false;
        state.success = false;
        state.error = Some(message);
        state.updated_at = Some(Utc::now());
    }
}
