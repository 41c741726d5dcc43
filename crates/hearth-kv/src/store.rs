//! # KvStore Trait
//!
//! The async contract every storage backend implements, plus the
//! [`Namespaced`] wrapper and typed JSON helpers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::KvResult;

/// Async string key-value storage.
///
/// Values are opaque strings; callers store JSON through [`load_json`] and
/// [`save_json`].
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value for a key. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Insert or replace the value for a key.
    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> KvResult<()>;

    /// All keys, sorted.
    async fn keys(&self) -> KvResult<Vec<String>>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> KvResult<()> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> KvResult<Vec<String>> {
        (**self).keys().await
    }
}

// =============================================================================
// Namespaced
// =============================================================================

/// Prefixes every key with `{namespace}:` so several apps (or test cases)
/// can share one backend.
pub struct Namespaced<S> {
    inner: S,
    prefix: String,
}

impl<S: KvStore> Namespaced<S> {
    pub fn new(inner: S, namespace: &str) -> Self {
        Namespaced {
            inner,
            prefix: format!("{}:", namespace),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl<S: KvStore> KvStore for Namespaced<S> {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.inner.get(&self.full_key(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.inner.set(&self.full_key(key), value).await
    }

    async fn remove(&self, key: &str) -> KvResult<()> {
        self.inner.remove(&self.full_key(key)).await
    }

    /// Only keys in this namespace, with the prefix stripped.
    async fn keys(&self) -> KvResult<Vec<String>> {
        let keys = self.inner.keys().await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }
}

// =============================================================================
// JSON Helpers
// =============================================================================

/// Reads and deserializes a JSON blob.
///
/// A missing key is `Ok(None)`; a blob that does not parse is
/// `Err(KvError::Serialization)`.
pub async fn load_json<T, S>(store: &S, key: &str) -> KvResult<Option<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serializes a value and writes it directly, bypassing the write queue.
pub async fn save_json<T, S>(store: &S, key: &str, value: &T) -> KvResult<()>
where
    T: Serialize + ?Sized,
    S: KvStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use crate::KvError;

    #[tokio::test]
    async fn test_namespaced_keys_are_isolated() {
        let backend = Arc::new(MemoryKvStore::new());
        let a = Namespaced::new(backend.clone(), "app-a");
        let b = Namespaced::new(backend.clone(), "app-b");

        a.set("theme", "\"dark\"").await.unwrap();
        assert_eq!(a.get("theme").await.unwrap().as_deref(), Some("\"dark\""));
        assert_eq!(b.get("theme").await.unwrap(), None);

        assert_eq!(a.keys().await.unwrap(), vec!["theme".to_string()]);
        assert_eq!(backend.keys().await.unwrap(), vec!["app-a:theme".to_string()]);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryKvStore::new();
        save_json(&store, "list", &vec![1, 2, 3]).await.unwrap();

        let back: Option<Vec<i32>> = load_json(&store, "list").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = load_json(&store, "nope").await.unwrap();
        assert!(missing.is_none());

        store.set("bad", "{not json").await.unwrap();
        let err = load_json::<Vec<i32>, _>(&store, "bad").await.unwrap_err();
        assert!(matches!(err, KvError::Serialization(_)));
    }
}
