use alert_core::CoreError;
use async_trait::async_trait;
use notify_rust::Notification;
use tracing::debug;

pub const NOTIFICATION_TITLE: &str = "Facebook Keyword Alert";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<(), CoreError>;
}

/// Desktop notifications through the platform notification service.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
    icon: Option<String>,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("keyword-alert")
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), CoreError> {
        let app_name = self.app_name.clone();
        let icon = self.icon.clone();
        let title = title.to_string();
        let message = message.to_string();

        // The platform call blocks on D-Bus / WinRT.
        let shown = tokio::task::spawn_blocking(move || {
            let mut notification = Notification::new();
            notification.appname(&app_name).summary(&title).body(&message);
            if let Some(icon) = &icon {
                notification.icon(icon);
            }
            notification.show().map(|_| ()).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| CoreError::Internal {
            message: format!("notification task failed: {}", e),
        })?;

        shown.map_err(|reason| CoreError::Internal {
            message: format!("notification failed: {}", reason),
        })?;
        debug!("Desktop notification shown");
        Ok(())
    }
}

/// `Found 1 new match` / `Found 3 new matches`.
pub fn match_summary(count: usize) -> String {
    if count == 1 {
        "Found 1 new match".to_string()
    } else {
        format!("Found {} new matches", count)
    }
}
