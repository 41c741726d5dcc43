//! # Favorites Store
//!
//! Cooks the customer has starred, as full snapshots so the favorites
//! screen renders without a lookup.
//!
//! Stored under `favorites-storage` inside the persist envelope:
//! ```json
//! { "state": { "favoriteCooks": [ { "id": "cook-1", ... } ] }, "version": 0 }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hearth_core::Cook;
use hearth_kv::{PersistHandle, WriteQueue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{load_slice, LoadOutcome, PersistEnvelope, FAVORITES_KEY};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoritesSnapshot {
    #[serde(default)]
    favorite_cooks: Vec<Cook>,
}

#[derive(Default)]
struct Inner {
    cooks: Vec<Cook>,
    /// Set once hydrated; later `initialize` calls report it again.
    hydrated: Option<LoadOutcome>,
    /// Removals and clears made before hydration, replayed onto the
    /// loaded list.
    removed_early: HashSet<String>,
    cleared_early: bool,
}

/// Writes stay parked until [`FavoritesStore::initialize`] has read the
/// stored list; actions taken before then are merged into it.
pub struct FavoritesStore {
    queue: Arc<WriteQueue>,
    inner: RwLock<Inner>,
}

impl FavoritesStore {
    pub fn new(queue: Arc<WriteQueue>) -> Self {
        queue.hold(FAVORITES_KEY);
        FavoritesStore {
            queue,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Hydrates from storage. `Missing` and `Failed` leave the list empty.
    pub async fn initialize(&self) -> LoadOutcome {
        let hydrated = self.read().hydrated.clone();
        if let Some(outcome) = hydrated {
            return outcome;
        }

        let (stored, outcome) =
            load_slice::<PersistEnvelope<FavoritesSnapshot>>(&self.queue, FAVORITES_KEY).await;

        let mut inner = self.write();
        if let Some(outcome) = inner.hydrated.clone() {
            return outcome;
        }
        if let Some(envelope) = stored {
            if !inner.cleared_early {
                let mut merged: Vec<Cook> = envelope
                    .state
                    .favorite_cooks
                    .into_iter()
                    .filter(|c| !inner.removed_early.contains(&c.id))
                    .collect();
                for cook in inner.cooks.drain(..) {
                    if !merged.iter().any(|c| c.id == cook.id) {
                        merged.push(cook);
                    }
                }
                inner.cooks = merged;
            }
        }
        inner.removed_early.clear();
        inner.hydrated = Some(outcome.clone());
        debug!(count = inner.cooks.len(), "Favorites loaded");

        drop(self.release(&inner.cooks));
        outcome
    }

    /// Adds a cook unless one with the same id is already there.
    pub fn add_favorite_cook(&self, cook: Cook) -> PersistHandle {
        let mut inner = self.write();
        if inner.cooks.iter().any(|c| c.id == cook.id) {
            debug!(cook_id = %cook.id, "Cook already in favorites");
            return PersistHandle::skipped();
        }
        if inner.hydrated.is_none() {
            inner.removed_early.remove(&cook.id);
        }
        inner.cooks.push(cook);
        self.persist(&inner.cooks)
    }

    pub fn remove_favorite_cook(&self, cook_id: &str) -> PersistHandle {
        let mut inner = self.write();
        if inner.hydrated.is_none() {
            // The cook may only exist in the list not read yet
            inner.cooks.retain(|c| c.id != cook_id);
            inner.removed_early.insert(cook_id.to_string());
            return self.persist(&inner.cooks);
        }

        let before = inner.cooks.len();
        inner.cooks.retain(|c| c.id != cook_id);
        if inner.cooks.len() == before {
            return PersistHandle::skipped();
        }
        self.persist(&inner.cooks)
    }

    pub fn is_favorite_cook(&self, cook_id: &str) -> bool {
        self.read().cooks.iter().any(|c| c.id == cook_id)
    }

    pub fn favorite_cooks(&self) -> Vec<Cook> {
        self.read().cooks.clone()
    }

    pub fn clear_favorites(&self) -> PersistHandle {
        let mut inner = self.write();
        inner.cooks.clear();
        if inner.hydrated.is_none() {
            inner.cleared_early = true;
            inner.removed_early.clear();
        }
        self.persist(&inner.cooks)
    }

    // Called with the write lock held so queue order matches mutation order
    fn persist(&self, cooks: &[Cook]) -> PersistHandle {
        self.queue.enqueue_json(FAVORITES_KEY, &envelope(cooks))
    }

    fn release(&self, cooks: &[Cook]) -> PersistHandle {
        self.queue.release_json(FAVORITES_KEY, &envelope(cooks))
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn envelope(cooks: &[Cook]) -> PersistEnvelope<FavoritesSnapshot> {
    PersistEnvelope::new(FavoritesSnapshot {
        favorite_cooks: cooks.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_kv::{KvStore, MemoryKvStore};

    fn cook(id: &str, name: &str) -> Cook {
        Cook {
            id: id.to_string(),
            name: name.to_string(),
            avatar_url: None,
            bio: None,
            cuisine: vec!["Nigerian".to_string()],
            rating: 4.8,
            review_count: 31,
            distance_km: Some(1.2),
            verified: true,
        }
    }

    async fn store() -> (Arc<MemoryKvStore>, FavoritesStore) {
        let backend = Arc::new(MemoryKvStore::new());
        let queue = Arc::new(WriteQueue::new(backend.clone()));
        let favorites = FavoritesStore::new(queue);
        assert_eq!(favorites.initialize().await, LoadOutcome::Missing);
        (backend, favorites)
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (_, favorites) = store().await;
        favorites.add_favorite_cook(cook("cook-1", "Ada")).await.unwrap();
        let second = favorites.add_favorite_cook(cook("cook-1", "Ada (renamed)"));
        assert!(second.is_skipped());

        let cooks = favorites.favorite_cooks();
        assert_eq!(cooks.len(), 1);
        assert_eq!(cooks[0].name, "Ada");
    }

    #[tokio::test]
    async fn test_is_favorite_on_empty_list() {
        let (_, favorites) = store().await;
        assert!(!favorites.is_favorite_cook("cook-1"));
    }

    #[tokio::test]
    async fn test_remove_and_persisted_envelope() {
        let (backend, favorites) = store().await;
        drop(favorites.add_favorite_cook(cook("cook-1", "Ada")));
        drop(favorites.add_favorite_cook(cook("cook-2", "Tunde")));
        favorites.remove_favorite_cook("cook-1").await.unwrap();
        assert!(favorites.remove_favorite_cook("nobody").is_skipped());

        let raw = backend.raw(FAVORITES_KEY).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], 0);
        assert_eq!(json["state"]["favoriteCooks"][0]["id"], "cook-2");
        assert_eq!(json["state"]["favoriteCooks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_hydrates() {
        let (backend, favorites) = store().await;
        favorites.add_favorite_cook(cook("cook-9", "Bisi")).await.unwrap();

        let queue = Arc::new(WriteQueue::new(backend.clone()));
        let reloaded = FavoritesStore::new(queue);
        assert_eq!(reloaded.initialize().await, LoadOutcome::Loaded);
        assert!(reloaded.is_favorite_cook("cook-9"));

        reloaded.clear_favorites().await.unwrap();
        assert!(reloaded.favorite_cooks().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_with_corrupt_blob_keeps_default() {
        let backend = Arc::new(MemoryKvStore::new());
        backend.set(FAVORITES_KEY, "{\"state\": 42}").await.unwrap();
        let favorites = FavoritesStore::new(Arc::new(WriteQueue::new(backend)));

        assert!(matches!(favorites.initialize().await, LoadOutcome::Failed(_)));
        assert!(favorites.favorite_cooks().is_empty());
    }

    #[tokio::test]
    async fn test_actions_before_initialize_merge_with_stored_list() {
        let backend = Arc::new(MemoryKvStore::new());
        let seed = envelope(&[cook("cook-1", "Ada"), cook("cook-2", "Tunde")]);
        backend
            .set(FAVORITES_KEY, &serde_json::to_string(&seed).unwrap())
            .await
            .unwrap();

        let favorites = FavoritesStore::new(Arc::new(WriteQueue::new(backend.clone())));
        let added = favorites.add_favorite_cook(cook("cook-3", "Bisi"));
        let removed = favorites.remove_favorite_cook("cook-1");
        assert_eq!(favorites.initialize().await, LoadOutcome::Loaded);
        added.await.unwrap();
        removed.await.unwrap();

        let ids: Vec<String> = favorites.favorite_cooks().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["cook-2", "cook-3"]);

        let reloaded = FavoritesStore::new(Arc::new(WriteQueue::new(backend)));
        reloaded.initialize().await;
        assert_eq!(reloaded.favorite_cooks().len(), 2);
        assert!(reloaded.is_favorite_cook("cook-2"));
        assert!(reloaded.is_favorite_cook("cook-3"));
    }

    #[tokio::test]
    async fn test_clear_before_initialize_drops_stored_list() {
        let backend = Arc::new(MemoryKvStore::new());
        let seed = envelope(&[cook("cook-1", "Ada")]);
        backend
            .set(FAVORITES_KEY, &serde_json::to_string(&seed).unwrap())
            .await
            .unwrap();

        let favorites = FavoritesStore::new(Arc::new(WriteQueue::new(backend.clone())));
        let cleared = favorites.clear_favorites();
        favorites.initialize().await;
        cleared.await.unwrap();

        assert!(favorites.favorite_cooks().is_empty());
        let raw = backend.raw(FAVORITES_KEY).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["state"]["favoriteCooks"].as_array().unwrap().is_empty());
    }
}
