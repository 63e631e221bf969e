use crate::KeyValueStore;
use alert_core::{CoreError, DedupeLedger, Settings, StorageError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SEEN_POSTS_KEY: &str = "seenPosts";

/// Reads and writes [`Settings`] one store key per field.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads settings, substituting defaults for absent keys.
    ///
    /// A key holding a value of the wrong shape is logged and treated as absent.
    pub async fn load(&self) -> Result<Settings, CoreError> {
        let stored = self.store.get_many(&Settings::KEYS).await?;
        let mut object: Map<String, Value> = stored.into_iter().collect();

        match serde_json::from_value::<Settings>(Value::Object(object.clone())) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Stored settings did not parse as a whole ({}), checking keys", e);
                object.retain(|key, value| {
                    let mut single = Map::new();
                    single.insert(key.clone(), value.clone());
                    let ok = serde_json::from_value::<Settings>(Value::Object(single)).is_ok();
                    if !ok {
                        warn!("Ignoring malformed stored value for '{}'", key);
                    }
                    ok
                });
                Ok(serde_json::from_value(Value::Object(object))?)
            }
        }
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), CoreError> {
        let value = serde_json::to_value(settings)?;
        let Value::Object(object) = value else {
            return Err(StorageError::MalformedValue {
                key: "settings".to_string(),
                details: "settings did not serialize to an object".to_string(),
            }
            .into());
        };
        self.store.set_many(object.into_iter().collect()).await?;
        debug!("Saved settings ({} keywords)", settings.keywords.len());
        Ok(())
    }

    /// Writes the keys present in `patch` over the stored settings and
    /// returns the result.
    pub async fn update(&self, patch: &Map<String, Value>) -> Result<Settings, CoreError> {
        let settings = self.load().await?.merged(patch)?;
        self.save(&settings).await?;
        Ok(settings)
    }
}

/// Whole-ledger load and store under [`SEEN_POSTS_KEY`].
///
/// There is no partial update: callers load, modify and save the full map.
#[derive(Clone)]
pub struct LedgerRepository {
    store: Arc<dyn KeyValueStore>,
}

impl LedgerRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, now: i64) -> Result<DedupeLedger, CoreError> {
        let map = match self.store.get(SEEN_POSTS_KEY).await? {
            Some(value) => match serde_json::from_value::<HashMap<String, i64>>(value) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Discarding malformed dedupe ledger: {}", e);
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };
        Ok(DedupeLedger::from_map(map, now))
    }

    /// Prunes as of `now` and writes the full ledger back.
    pub async fn save(&self, ledger: &mut DedupeLedger, now: i64) -> Result<(), CoreError> {
        ledger.prune(now);
        let value = serde_json::to_value(ledger.to_map())?;
        self.store.set(SEEN_POSTS_KEY, value).await?;
        debug!("Saved dedupe ledger with {} entries", ledger.len());
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CoreError> {
        self.store.remove(SEEN_POSTS_KEY).await
    }
}
