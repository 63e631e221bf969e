use alert_core::{CoreError, ErrorExt, MatchRecord, Settings, WebhookError, WebhookPayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub mod retry;
pub mod transport;


pub use retry::{RetryConfig, RetryExecutor, RetryMetrics};
pub use transport::{HttpTransport, WebhookTransport};

pub const TEST_SOURCE: &str = "test";

/// Where and how to deliver a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub url: String,
    pub token: Option<String>,
}

impl WebhookTarget {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.webhook_url.trim().to_string(),
            token: settings.webhook_token().map(str::to_string),
        }
    }

    fn validate(&self) -> Result<(), WebhookError> {
        if self.url.is_empty() {
            return Err(WebhookError::MissingUrl);
        }
        match Url::parse(&self.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
            _ => Err(WebhookError::InvalidUrl {
                url: self.url.clone(),
            }),
        }
    }
}

/// Posts match batches to the configured webhook with bounded retries.
pub struct WebhookSink {
    transport: Arc<dyn WebhookTransport>,
    retry: RetryExecutor,
}

impl WebhookSink {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self {
            transport,
            retry: RetryExecutor::new(RetryConfig::webhook()),
        }
    }

    pub fn http(timeout: Duration) -> Result<Self, CoreError> {
        Ok(Self::new(Arc::new(HttpTransport::new(timeout)?)))
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    /// Delivers `matches`, returning whether the webhook accepted them.
    ///
    /// Never fails: exhausted retries and configuration problems are logged
    /// and reported as `false`.
    pub async fn send(
        &self,
        target: &WebhookTarget,
        matches: Vec<MatchRecord>,
        source: &str,
    ) -> bool {
        let count = matches.len();
        match self.deliver(target, matches, source).await {
            Ok(()) => {
                info!("Delivered {} match(es) to webhook", count);
                true
            }
            Err(e) => {
                warn!(
                    "Webhook delivery of {} match(es) failed [{}]: {}",
                    count,
                    e.error_code(),
                    e
                );
                false
            }
        }
    }

    /// Like [`send`](Self::send) but surfaces the error.
    pub async fn deliver(
        &self,
        target: &WebhookTarget,
        matches: Vec<MatchRecord>,
        source: &str,
    ) -> Result<(), CoreError> {
        target.validate()?;

        let payload = WebhookPayload::new(target.token.as_deref(), source, matches);
        let transport = &self.transport;
        let url = target.url.as_str();
        let payload = &payload;

        self.retry
            .execute("webhook delivery", || transport.post_json(url, payload))
            .await
    }

    /// Sends one sample match tagged with the `test` source.
    pub async fn send_test(&self, target: &WebhookTarget) -> Result<(), CoreError> {
        self.deliver(target, vec![sample_match()], TEST_SOURCE).await
    }

    pub fn metrics(&self) -> RetryMetrics {
        self.retry.get_metrics()
    }
}

/// The record used by "test webhook".
pub fn sample_match() -> MatchRecord {
    MatchRecord::new(
        "wilmington",
        "test-group-123",
        None,
        "This is a test notification for wilmington area housing",
    )
}
