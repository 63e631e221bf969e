use alert_core::{CoreError, WebhookError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000, // 1 second
            max_delay_ms: 30000, // 30 seconds
            backoff_multiplier: 2.0,
            jitter_factor: 0.1, // 10% jitter
        }
    }
}

impl RetryConfig {
    /// Webhook delivery: one attempt plus up to three retries, waiting
    /// 1s, 2s and 4s before them.
    pub fn webhook() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1000,
            max_delay_ms: 4000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Don't retry (for permanent failures)
    NoRetry,
}

/// Determine retry strategy based on error type
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::Webhook(webhook_error) => match webhook_error {
            // Any non-2xx answer counts as a failed delivery
            WebhookError::Status { .. } => RetryStrategy::Retry,
            WebhookError::RequestFailed { .. } => RetryStrategy::Retry,
            // A bad or missing URL will not fix itself
            WebhookError::MissingUrl => RetryStrategy::NoRetry,
            WebhookError::InvalidUrl { .. } => RetryStrategy::NoRetry,
            WebhookError::Exhausted { .. } => RetryStrategy::NoRetry,
        },
        CoreError::Network(_) => RetryStrategy::Retry,
        CoreError::Timeout { .. } => RetryStrategy::Retry,
        // Other errors are usually not worth retrying
        _ => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = Duration::from_millis(config.base_delay_ms);
    let max_delay = Duration::from_millis(config.max_delay_ms);

    // Calculate exponential backoff
    let exponential_delay = if attempt == 0 {
        base_delay
    } else {
        let multiplier = config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(config.max_delay_ms))
    };

    if config.jitter_factor <= 0.0 {
        return exponential_delay.min(max_delay);
    }

    // Add jitter to prevent thundering herd
    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    // Ensure we don't exceed max delay
    final_delay.min(max_delay)
}

/// Retry metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct RetryMetrics {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub failed_operations: u64,
}

/// Retry executor that wraps operations with retry logic
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    metrics: Arc<Mutex<RetryMetrics>>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(Mutex::new(RetryMetrics::default())),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut last_error: Option<String> = None;
        let mut total_delay_ms = 0u64;
        let mut attempts = 0u32;

        for attempt in 0..self.config.max_attempts {
            attempts = attempt + 1;
            if attempt > 0 {
                debug!("Retry attempt {} for {}", attempt, operation_name);
            }

            let start_time = Instant::now();
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        let mut metrics = self.lock_metrics();
                        metrics.total_retries += attempt as u64;
                        metrics.successful_retries += 1;

                        info!(
                            "Operation {} succeeded after {} retries (total delay: {}ms)",
                            operation_name, attempt, total_delay_ms
                        );
                    }

                    return Ok(result);
                }
                Err(error) => {
                    debug!(
                        "Attempt {} failed for {} after {:?}: {}",
                        attempt + 1,
                        operation_name,
                        start_time.elapsed(),
                        error
                    );

                    let should_retry = attempt + 1 < self.config.max_attempts;

                    match get_retry_strategy(&error) {
                        RetryStrategy::NoRetry => {
                            debug!(
                                "Not retrying {} due to error type: {}",
                                operation_name, error
                            );
                            let mut metrics = self.lock_metrics();
                            metrics.total_retries += attempt as u64;
                            metrics.failed_operations += 1;
                            return Err(error);
                        }
                        RetryStrategy::Retry if should_retry => {
                            let delay = calculate_delay(attempt, &self.config);
                            total_delay_ms += delay.as_millis() as u64;

                            info!(
                                "Retrying {} in {:?} due to: {}",
                                operation_name, delay, error
                            );

                            last_error = Some(error.to_string());
                            sleep(delay).await;
                        }
                        RetryStrategy::Retry => {
                            last_error = Some(error.to_string());
                            break;
                        }
                    }
                }
            }
        }

        {
            let mut metrics = self.lock_metrics();
            metrics.total_retries += attempts.saturating_sub(1) as u64;
            metrics.failed_operations += 1;
        }

        warn!(
            "Operation {} failed after {} attempts with total delay of {}ms",
            operation_name, attempts, total_delay_ms
        );

        Err(CoreError::Webhook(WebhookError::Exhausted {
            attempts,
            last_error: last_error.unwrap_or_else(|| "no attempts were made".to_string()),
        }))
    }

    /// Get current retry metrics
    pub fn get_metrics(&self) -> RetryMetrics {
        self.lock_metrics().clone()
    }

    /// Reset metrics (useful for testing or periodic cleanup)
    pub fn reset_metrics(&self) {
        *self.lock_metrics() = RetryMetrics::default();
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, RetryMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
