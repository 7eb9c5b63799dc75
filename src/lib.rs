// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer (business logic)
pub mod notification;
pub mod retry;
pub mod transport;

pub use error::{DispatchError, Result, GENERIC_SEND_ERROR};
pub use notification::{
    validate, DispatchReceipt, ImageAttachment, NotificationDispatcher, NotificationRequest,
    NotificationRequestBuilder, NotificationType, RequestState, ValidationError,
};
pub use retry::{CancelToken, RetryPolicy};
pub use transport::{GatewayError, HttpNotificationGateway, NotificationGateway};
