use crate::error::ConfigError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Browser-assigned tab identifier.
pub type TabId = i64;

pub const PREVIEW_MAX_CHARS: usize = 500;
pub const FULL_TEXT_MAX_CHARS: usize = 5000;

/// A keyword hit reported by a page scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub keyword: String,
    #[serde(alias = "group")]
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub full_text: String,
    #[serde(default = "now_iso8601")]
    pub timestamp: String,
}

impl MatchRecord {
    pub fn new(
        keyword: impl Into<String>,
        group_id: impl Into<String>,
        post_url: Option<String>,
        text: &str,
    ) -> Self {
        let full_text = truncate_chars(text, FULL_TEXT_MAX_CHARS);
        Self {
            keyword: keyword.into(),
            group_id: group_id.into(),
            post_url,
            preview: truncate_chars(&full_text, PREVIEW_MAX_CHARS),
            full_text,
            timestamp: now_iso8601(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Enforces the preview and full-text length limits on records that
    /// arrive from a content script.
    pub fn clamped(mut self) -> Self {
        if self.full_text.chars().count() > FULL_TEXT_MAX_CHARS {
            self.full_text = truncate_chars(&self.full_text, FULL_TEXT_MAX_CHARS);
        }
        if self.preview.chars().count() > PREVIEW_MAX_CHARS {
            self.preview = truncate_chars(&self.preview, PREVIEW_MAX_CHARS);
        }
        self
    }

    pub fn fingerprint(&self) -> String {
        crate::ledger::fingerprint(self)
    }
}

/// User settings as persisted in the key-value store.
///
/// Every field maps to one store key (the camelCase field name). Keys that
/// are absent from the store deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub webhook_token: String,
    #[serde(default = "default_scan_interval_minutes")]
    pub scan_interval_minutes: u32,
    #[serde(default)]
    pub monitored_group_urls: Vec<String>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub auto_scroll: bool,
    #[serde(default = "default_max_scroll_attempts")]
    pub max_scroll_attempts: u32,
}

impl Settings {
    pub const KEYS: [&'static str; 8] = [
        "keywords",
        "webhookUrl",
        "webhookToken",
        "scanIntervalMinutes",
        "monitoredGroupUrls",
        "notificationsEnabled",
        "autoScroll",
        "maxScrollAttempts",
    ];

    pub fn webhook_token(&self) -> Option<&str> {
        let token = self.webhook_token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Monitored URLs with blanks removed.
    pub fn monitored_groups(&self) -> Vec<&str> {
        self.monitored_group_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .collect()
    }

    /// A scan pass needs both keywords and somewhere to send the results.
    pub fn validate_for_scan(&self) -> Result<(), ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::MissingField {
                field: "keywords".to_string(),
            });
        }
        if self.webhook_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "webhookUrl".to_string(),
            });
        }
        Ok(())
    }

    /// Overlays the keys present in `patch` and normalizes the result. Keys
    /// missing from `patch` keep their current values.
    pub fn merged(self, patch: &Map<String, Value>) -> Result<Self, ConfigError> {
        if let Some(key) = patch.keys().find(|k| !Self::KEYS.contains(&k.as_str())) {
            return Err(ConfigError::InvalidValue {
                field: key.clone(),
                value: "not a settings key".to_string(),
            });
        }

        let mut object = match serde_json::to_value(self) {
            Ok(Value::Object(object)) => object,
            Ok(_) => Map::new(),
            Err(e) => {
                return Err(ConfigError::InvalidFormat {
                    details: e.to_string(),
                })
            }
        };
        for (key, value) in patch {
            object.insert(key.clone(), value.clone());
        }

        let settings: Settings = serde_json::from_value(Value::Object(object)).map_err(|e| {
            ConfigError::InvalidFormat {
                details: e.to_string(),
            }
        })?;
        Ok(settings.normalized())
    }

    /// Re-applies keyword normalization after an edit from the UI.
    pub fn normalized(mut self) -> Self {
        self.keywords = crate::matcher::dedupe_keywords(self.keywords);
        self.webhook_url = self.webhook_url.trim().to_string();
        self.webhook_token = self.webhook_token.trim().to_string();
        self.monitored_group_urls = self
            .monitored_groups()
            .into_iter()
            .map(str::to_string)
            .collect();
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            webhook_url: String::new(),
            webhook_token: String::new(),
            scan_interval_minutes: default_scan_interval_minutes(),
            monitored_group_urls: Vec::new(),
            notifications_enabled: true,
            auto_scroll: false,
            max_scroll_attempts: default_max_scroll_attempts(),
        }
    }
}

fn default_scan_interval_minutes() -> u32 {
    2
}

fn default_max_scroll_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeywords {
    List(Vec<String>),
    Text(String),
}

/// Keywords were stored as a comma/newline separated string by older
/// options pages and as an array by newer ones; both are accepted.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawKeywords>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawKeywords::List(list)) => crate::matcher::dedupe_keywords(list),
        Some(RawKeywords::Text(text)) => crate::matcher::normalize_keywords(&text),
        None => Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageAction {
    Scan,
}

/// Message sent to a tab's content script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub action: PageAction,
    pub keywords: Vec<String>,
    pub auto_scroll: bool,
    pub max_scroll_attempts: u32,
}

impl ScanRequest {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            action: PageAction::Scan,
            keywords: settings.keywords.clone(),
            auto_scroll: settings.auto_scroll,
            max_scroll_attempts: settings.max_scroll_attempts,
        }
    }
}

/// Content script reply: `{matches}` on success, `{matches: [], error}` on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// JSON body POSTed to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub source: String,
    pub matches: Vec<MatchRecord>,
    pub timestamp: String,
}

impl WebhookPayload {
    pub fn new(token: Option<&str>, source: &str, matches: Vec<MatchRecord>) -> Self {
        Self {
            token: token.map(str::to_string),
            source: source.to_string(),
            matches,
            timestamp: now_iso8601(),
        }
    }
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
