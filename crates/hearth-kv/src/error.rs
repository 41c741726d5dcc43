//! # Storage Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / serde_json::Error                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  KvError (this module)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LoadOutcome::Failed / PersistHandle result (hearth-client)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Logged and defaulted; never shown to the user                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Key-value storage errors.
#[derive(Debug, Clone, Error)]
pub enum KvError {
    /// Opening the database failed (bad path, permissions, disk full).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A read or write against the backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored blob could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The write queue worker for a key stopped before confirming a write.
    #[error("Write worker for '{0}' stopped")]
    WorkerStopped(String),

    /// A write was enqueued outside of a tokio runtime.
    #[error("No async runtime available for persistence")]
    NoRuntime,
}

impl From<sqlx::Error> for KvError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => KvError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::PoolTimedOut => {
                KvError::ConnectionFailed("Timed out acquiring connection".to_string())
            }
            _ => KvError::Storage(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for KvError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        KvError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type KvResult<T> = Result<T, KvError>;
