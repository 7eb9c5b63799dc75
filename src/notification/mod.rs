//! Condition-based notification requests: model, validation, lifecycle state
//! and the dispatcher orchestrating delivery.

mod dispatcher;
mod state;
mod types;
mod validate;

pub use dispatcher::{
    DispatchReceipt, DispatcherStats, DispatcherStatsSnapshot, NotificationDispatcher,
};
pub use state::RequestState;
pub use types::{
    ImageAttachment, NotificationRequest, NotificationRequestBuilder, NotificationType,
};
pub use validate::{validate, ValidationError};
