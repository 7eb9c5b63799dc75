//! Delivery seam between the dispatcher and the notification backend.
//!
//! The dispatcher only sees the [`NotificationGateway`] trait; production code
//! wires in [`HttpNotificationGateway`], tests substitute a scripted fake.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::GENERIC_SEND_ERROR;
use crate::notification::NotificationRequest;
use crate::retry::Retryable;

pub use http::HttpNotificationGateway;

/// Outcome of a single delivery attempt.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a usable response (connection refused,
    /// DNS failure, malformed response, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request timed out without a response.
    #[error("timed out waiting for the notification backend")]
    Timeout,

    /// The backend answered with a non-2xx status. `message` carries the
    /// structured `message` field from the response body, when one was present.
    #[error("backend rejected request with status {status}")]
    Rejected { status: u16, message: Option<String> },
}

impl GatewayError {
    /// Human-readable message written into `RequestState.error` on terminal
    /// failure.
    ///
    /// Precedence: structured backend message, then the transport error
    /// description, then the generic fallback.
    pub fn surface_message(&self) -> String {
        match self {
            GatewayError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            GatewayError::Rejected { message: None, .. } => self.to_string(),
            GatewayError::Transport(err) => err.to_string(),
            GatewayError::Timeout => GENERIC_SEND_ERROR.to_string(),
        }
    }
}

impl Retryable for GatewayError {
    // The backend is retried regardless of status class; rejected requests
    // (including 4xx) go through the full attempt budget.
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Transport abstraction for delivering one notification request.
///
/// One call == one network attempt; retry lives in the dispatcher.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn deliver(
        &self,
        request: &NotificationRequest,
        bearer_token: &str,
    ) -> Result<(), GatewayError>;
}
