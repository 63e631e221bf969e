use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Webhook(e) => {
                error!("Webhook error details: {:?}", e);
            }
            CoreError::Browser(e) => {
                error!("Browser error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Webhook(e) => e.is_retryable(),
            CoreError::Browser(e) => e.is_retryable(),
            CoreError::Storage(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Webhook(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Webhook(e) => e.user_friendly_message(),
            CoreError::Browser(e) => e.user_friendly_message(),
            CoreError::Storage(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Webhook(_) => "WEBHOOK".to_string(),
            CoreError::Browser(_) => "BROWSER".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for WebhookError {
    fn log_error(&self) -> &Self {
        error!("WebhookError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("WebhookError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        // Any non-2xx response is worth another attempt.
        matches!(
            self,
            WebhookError::Status { .. } | WebhookError::RequestFailed { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(1))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            WebhookError::MissingUrl => {
                "No webhook URL is configured. Add one in the options page.".to_string()
            }
            WebhookError::InvalidUrl { url } => {
                format!("The webhook URL '{}' is not a valid http(s) URL.", url)
            }
            WebhookError::Status { status_code } => format!(
                "The webhook rejected the request (HTTP {}). Check the endpoint deployment.",
                status_code
            ),
            WebhookError::RequestFailed { .. } => {
                "Could not reach the webhook. Please check your connection.".to_string()
            }
            WebhookError::Exhausted { attempts, .. } => format!(
                "The webhook could not be reached after {} attempts.",
                attempts
            ),
        }
    }

    fn error_code(&self) -> String {
        match self {
            WebhookError::MissingUrl => "WEBHOOK_MISSING_URL".to_string(),
            WebhookError::InvalidUrl { .. } => "WEBHOOK_INVALID_URL".to_string(),
            WebhookError::Status { .. } => "WEBHOOK_HTTP_STATUS".to_string(),
            WebhookError::RequestFailed { .. } => "WEBHOOK_REQUEST_FAILED".to_string(),
            WebhookError::Exhausted { .. } => "WEBHOOK_EXHAUSTED".to_string(),
        }
    }
}

impl ErrorExt for BrowserError {
    fn log_error(&self) -> &Self {
        error!("BrowserError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("BrowserError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        // Tab messaging failures are logged and skipped, never retried.
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            BrowserError::ChannelClosed { .. } => {
                "The page did not answer. Reload the group tab and try again.".to_string()
            }
            BrowserError::ScanFailed { reason, .. } => format!("The page scan failed: {}", reason),
            BrowserError::OpenFailed { url, .. } => format!("Could not open {}", url),
            BrowserError::QueryFailed { .. } => "Could not list open tabs.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            BrowserError::ChannelClosed { .. } => "BROWSER_CHANNEL_CLOSED".to_string(),
            BrowserError::ScanFailed { .. } => "BROWSER_SCAN_FAILED".to_string(),
            BrowserError::OpenFailed { .. } => "BROWSER_OPEN_FAILED".to_string(),
            BrowserError::QueryFailed { .. } => "BROWSER_QUERY_FAILED".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn log_error(&self) -> &Self {
        error!("StorageError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StorageError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::DatabaseLocked | StorageError::ConnectionFailed { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            StorageError::DatabaseLocked => Some(Duration::from_millis(100)),
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StorageError::ConnectionFailed { .. } => {
                "Settings storage could not be opened. Please try again.".to_string()
            }
            StorageError::DatabaseLocked => {
                "Settings storage is temporarily busy. Please try again.".to_string()
            }
            StorageError::MalformedValue { key, .. } => {
                format!("The stored value for '{}' is damaged and was ignored.", key)
            }
            _ => "Storage error occurred. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::ConnectionFailed { .. } => "STORAGE_CONNECTION_FAILED".to_string(),
            StorageError::MigrationFailed { .. } => "STORAGE_MIGRATION_FAILED".to_string(),
            StorageError::MalformedValue { .. } => "STORAGE_MALFORMED_VALUE".to_string(),
            StorageError::DatabaseLocked => "STORAGE_LOCKED".to_string(),
            StorageError::Sql(_) => "STORAGE_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors need the user to fix something
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidFormat { .. } | ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
            ConfigError::MissingField { field } => {
                format!("Required setting '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for setting '{}'.", field)
            }
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                if let Some(retry_after) = error.retry_after() {
                    info!("Error is retryable. Retry after: {:?}", retry_after);
                }
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
