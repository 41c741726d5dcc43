//! # hearth-kv: On-Device Key-Value Storage
//!
//! Namespaced string storage for the Hearth client, holding one JSON blob
//! per store slice.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         hearth-kv Components                            │
//! │                                                                         │
//! │  ┌─────────────────┐     ┌──────────────────────────────────────────┐  │
//! │  │   WriteQueue    │────►│  KvStore (trait)                         │  │
//! │  │  per-key FIFO   │     │   ├── SqliteKvStore  (sqlx, WAL)         │  │
//! │  │  PersistHandle  │     │   ├── MemoryKvStore  (tests)             │  │
//! │  └─────────────────┘     │   └── Namespaced<S>  ("{ns}:{key}")      │  │
//! │                          └──────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use hearth_kv::{KvConfig, Namespaced, SqliteKvStore, WriteQueue};
//!
//! let sqlite = SqliteKvStore::open(KvConfig::new("hearth.db")).await?;
//! let queue = WriteQueue::new(Arc::new(Namespaced::new(sqlite, "hearth")));
//! queue.enqueue_json("@sound_enabled", &true).await?;
//! ```

pub mod error;
pub mod memory;
pub mod queue;
pub mod sqlite;
pub mod store;

pub use error::{KvError, KvResult};
pub use memory::MemoryKvStore;
pub use queue::{PersistHandle, WriteQueue};
pub use sqlite::{KvConfig, SqliteKvStore};
pub use store::{load_json, save_json, KvStore, Namespaced};
