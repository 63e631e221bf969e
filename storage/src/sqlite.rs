use crate::KeyValueStore;
use alert_core::{CoreError, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_KV_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed settings store. Values are stored as JSON text.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `database_url` and runs migrations.
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        Self::connect_with(database_url, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Like [`SqliteStore::connect`]; statements that find the database
    /// locked for longer than `busy_timeout` fail with `DatabaseLocked`.
    pub async fn connect_with(
        database_url: &str,
        busy_timeout: Duration,
    ) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StorageError::ConnectionFailed {
                reason: format!("{database_url}: {e}"),
            })?
            .create_if_missing(true)
            .busy_timeout(busy_timeout);

        // A single long-lived connection keeps `sqlite::memory:` databases alive
        // and serializes writes.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Opened settings store at {}", database_url);
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::query(CREATE_KV_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationFailed {
                migration: format!("create kv_store: {e}"),
            })?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CoreError> {
        let raw = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        match raw {
            Some(text) => {
                let value = serde_json::from_str(&text).map_err(|e| {
                    StorageError::MalformedValue {
                        key: key.to_string(),
                        details: e.to_string(),
                    }
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        let text = serde_json::to_string(&value)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(text)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        debug!("Stored key {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), CoreError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        for (key, value) in entries {
            let text = serde_json::to_string(&value)?;
            sqlx::query(
                r#"
                INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(key)
            .bind(text)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED (compared on the primary result code) become
/// `DatabaseLocked`; everything else stays a plain SQL error.
fn storage_error(error: sqlx::Error) -> StorageError {
    let locked = error
        .as_database_error()
        .and_then(|db| db.code())
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6));
    if locked {
        debug!("Database locked: {}", error);
        StorageError::DatabaseLocked
    } else {
        StorageError::Sql(error)
    }
}
