//! # SQLite Backend
//!
//! Key-value storage on a single SQLite table.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Key-Value Backend                           │
//! │                                                                         │
//! │  KvConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteKvStore::open(config).await ← Create pool + run migrations      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  kv_entries                              │                           │
//! │  │  key (PK) │ value (JSON text) │ updated_at│                          │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  Writers for one key are serialized by the WriteQueue, so the pool     │
//! │  only has to handle independent keys concurrently.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{KvError, KvResult};
use crate::store::KvStore;

/// Embedded migrations from the `migrations/` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

// =============================================================================
// Configuration
// =============================================================================

/// Storage configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = KvConfig::new("/path/to/hearth.db").max_connections(2);
/// let store = SqliteKvStore::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Path to the SQLite file. Created if missing.
    pub database_path: PathBuf,

    /// Default: 4 (a phone app has few concurrent writers)
    pub max_connections: u32,

    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Keep the database in memory (tests).
    pub in_memory: bool,
}

impl KvConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        KvConfig {
            database_path: path.into(),
            max_connections: 4,
            connect_timeout: Duration::from_secs(10),
            in_memory: false,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// In-memory configuration, isolated per store.
    pub fn in_memory() -> Self {
        KvConfig {
            database_path: PathBuf::from(":memory:"),
            // The in-memory database lives and dies with its only connection
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            in_memory: true,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// SQLite-backed [`KvStore`].
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Opens (or creates) the database and applies migrations.
    pub async fn open(config: KvConfig) -> KvResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.in_memory,
            "Opening key-value store"
        );

        let options = if config.in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| KvError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout);
        if config.in_memory {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| KvError::ConnectionFailed(e.to_string()))?;

        MIGRATOR.run(&pool).await?;
        debug!("Key-value schema up to date");

        Ok(SqliteKvStore { pool })
    }

    /// Convenience for tests.
    pub async fn open_in_memory() -> KvResult<Self> {
        Self::open(KvConfig::in_memory()).await
    }

    /// Returns true if the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing key-value store");
        self.pool.close().await;
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_entries WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(key, bytes = value.len(), "Stored entry");
        Ok(())
    }

    async fn remove(&self, key: &str) -> KvResult<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn keys(&self) -> KvResult<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM kv_entries ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SqliteKvStore::open_in_memory().await.unwrap();
        assert!(store.health_check().await);

        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("@sound_enabled", "true").await.unwrap();
        store.set("@sound_enabled", "false").await.unwrap();
        assert_eq!(
            store.get("@sound_enabled").await.unwrap().as_deref(),
            Some("false")
        );

        store.remove("@sound_enabled").await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.db");

        let store = SqliteKvStore::open(KvConfig::new(&path)).await.unwrap();
        store.set("@theme_mode", "\"dark\"").await.unwrap();
        store.close().await;

        let reopened = SqliteKvStore::open(KvConfig::new(&path)).await.unwrap();
        assert_eq!(
            reopened.get("@theme_mode").await.unwrap().as_deref(),
            Some("\"dark\"")
        );
    }

    #[test]
    fn test_config_builder() {
        let config = KvConfig::new("/tmp/hearth.db")
            .max_connections(2)
            .connect_timeout(Duration::from_secs(1));
        assert_eq!(config.max_connections, 2);
        assert!(!config.in_memory);
        assert!(KvConfig::in_memory().in_memory);
    }
}
