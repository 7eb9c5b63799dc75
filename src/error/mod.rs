use thiserror::Error;

use crate::notification::ValidationError;

/// Fallback message surfaced when a delivery failure carries no usable detail.
pub const GENERIC_SEND_ERROR: &str = "an error occurred while sending the notification";

/// Terminal outcome of a dispatch call.
///
/// Every failure ends up here and in the dispatcher's `RequestState`; nothing
/// panics across the subsystem boundary.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The request failed the local precondition check. No network call was made.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Delivery failed after exhausting the retry budget.
    #[error("{message}")]
    Delivery { attempts: u32, message: String },

    /// The caller cancelled the dispatch before a terminal outcome.
    #[error("dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Message as it is written into `RequestState.error`.
    pub fn state_message(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
