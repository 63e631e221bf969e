use crate::error::ConfigError;
use crate::pages::SitePattern;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LOG_FILTER: &str =
    "keyword_alert=info,scan_service=info,webhook_client=info,storage=info,alert_core=info";

/// Process-level configuration read from a TOML file.
///
/// User-facing settings (keywords, webhook URL, ...) live in the settings
/// store instead; this only covers how the process itself runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub log_filter: String,
    pub scan_timeout_secs: u64,
    pub open_stagger_ms: u64,
    pub webhook_source: String,
    pub webhook_timeout_secs: u64,
    pub site_hosts: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://keyword-alert.db".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            scan_timeout_secs: 30,
            open_stagger_ms: 800,
            webhook_source: "chrome_extension".to_string(),
            webhook_timeout_secs: 15,
            site_hosts: vec!["facebook.com".to_string(), "fb.com".to_string()],
        }
    }
}

impl AppConfig {
    /// Loads the file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ConfigError::PermissionDenied {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(ConfigError::InvalidFormat {
                details: format!("{}: {}", path.display(), e),
            }),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.site_hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                field: "site_hosts".to_string(),
            });
        }
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn open_stagger(&self) -> Duration {
        Duration::from_millis(self.open_stagger_ms)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn site_pattern(&self) -> SitePattern {
        SitePattern::new(self.site_hosts.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            database_url = "sqlite::memory:"
            site_hosts = ["fb.test"]
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.scan_timeout(), Duration::from_secs(30));
        assert_eq!(config.open_stagger(), Duration::from_millis(800));
        assert!(config.site_pattern().is_group_page("https://fb.test/groups/g1"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AppConfig::from_toml("scan_timeout_secs = 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AppConfig::from_toml("site_hosts = []"),
            Err(ConfigError::MissingField { .. })
        ));
        assert!(matches!(
            AppConfig::from_toml("scan_timeout_secs = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("keyword-alert-does-not-exist.toml");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }
}
