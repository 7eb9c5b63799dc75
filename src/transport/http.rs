//! HTTP implementation of the notification gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::notification::NotificationRequest;

use super::{GatewayError, NotificationGateway};

/// Path of the condition-based send endpoint, relative to the backend base URL.
pub const SEND_BY_CONDITION_PATH: &str = "/notifications/send-by-condition";

/// Delivers notification requests to the backend over HTTPS POST.
#[derive(Debug, Clone)]
pub struct HttpNotificationGateway {
    client: Client,
    base_url: String,
    send_path: String,
}

/// Error body shape the backend uses for rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpNotificationGateway {
    /// Create a gateway with the default send path and a 30s request timeout.
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            send_path: SEND_BY_CONDITION_PATH.to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, GatewayError> {
        let mut gateway =
            Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_seconds))?;
        gateway.send_path = config.send_path.clone();
        Ok(gateway)
    }

    fn send_url(&self) -> String {
        format!("{}{}", self.base_url, self.send_path)
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    #[tracing::instrument(
        name = "gateway.deliver",
        skip(self, request, bearer_token),
        fields(notification_type = %request.kind)
    )]
    async fn deliver(
        &self,
        request: &NotificationRequest,
        bearer_token: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.send_url())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", bearer_token),
            )
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(err)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "backend accepted notification");
            return Ok(());
        }

        // Probe the body for the backend's structured { "message": ... } shape;
        // anything else is treated as a bodyless rejection.
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.message);

        tracing::warn!(
            status = status.as_u16(),
            has_message = message.is_some(),
            "backend rejected notification"
        );

        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpNotificationGateway::new("http://localhost:8080/").unwrap();
        assert_eq!(
            gateway.send_url(),
            "http://localhost:8080/notifications/send-by-condition"
        );
    }

    #[test]
    fn test_send_path_from_config() {
        let config = BackendConfig {
            base_url: "http://backend.internal".to_string(),
            send_path: "/v2/notify".to_string(),
            timeout_seconds: 10,
        };
        let gateway = HttpNotificationGateway::from_config(&config).unwrap();
        assert_eq!(gateway.send_url(), "http://backend.internal/v2/notify");
    }
}
