//! Local precondition checks run before any network call.

use thiserror::Error;

use super::NotificationRequest;

/// Why a request was rejected without being sent.
///
/// Display strings are part of the contract with callers; UI code matches on
/// them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title required")]
    TitleRequired,
    #[error("body required")]
    BodyRequired,
    #[error("at least one targeting condition required when not sending to all")]
    TargetingRequired,
}

/// Validate a request against the send business rules.
///
/// Pure and deterministic; the first failing check wins. Checks run in order:
/// title, body, targeting conditions.
pub fn validate(request: &NotificationRequest) -> Result<(), ValidationError> {
    if request.title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if request.body.trim().is_empty() {
        return Err(ValidationError::BodyRequired);
    }
    if !request.send_all && !request.has_targeting() {
        return Err(ValidationError::TargetingRequired);
    }
    Ok(())
}
