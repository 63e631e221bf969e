use alert_core::{CoreError, WebhookError, WebhookPayload};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("keyword-alert/", env!("CARGO_PKG_VERSION"));

/// One delivery attempt of a payload to a URL.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// `Ok` only for a 2xx response.
    async fn post_json(&self, url: &str, payload: &WebhookPayload) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(&self, url: &str, payload: &WebhookPayload) -> Result<(), CoreError> {
        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WebhookError::RequestFailed {
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        debug!("Webhook POST {} -> {}", url, status);

        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::Status {
                status_code: status.as_u16(),
            }
            .into())
        }
    }
}
