//! Dark mode and sound preferences.
//!
//! Two independent keys: `@theme_mode` holds `dark` or `light`, and
//! `@sound_enabled` holds a JSON bool. Toggles change memory first; a failed
//! write is logged by the queue and memory is never reverted. A toggle made
//! before [`ThemeStore::initialize`] wins over the stored value for its key.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hearth_kv::{PersistHandle, WriteQueue};
use serde::Serialize;
use tracing::{debug, warn};

use super::{load_slice, LoadOutcome, SOUND_KEY, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub is_dark_mode: bool,
    pub sound_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            is_dark_mode: false,
            sound_enabled: true,
        }
    }
}

/// Per-key load results from [`ThemeStore::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeInit {
    pub theme: LoadOutcome,
    pub sound: LoadOutcome,
}

#[derive(Default)]
struct Inner {
    prefs: Preferences,
    hydrated: Option<ThemeInit>,
}

pub struct ThemeStore {
    queue: Arc<WriteQueue>,
    inner: RwLock<Inner>,
}

fn mode_name(dark: bool) -> &'static str {
    if dark {
        "dark"
    } else {
        "light"
    }
}

/// Accepts the bare word as well as a JSON string.
fn parse_mode(raw: &str) -> Option<bool> {
    let word = serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.trim().to_string());
    match word.as_str() {
        "dark" => Some(true),
        "light" => Some(false),
        _ => None,
    }
}

impl ThemeStore {
    pub fn new(queue: Arc<WriteQueue>) -> Self {
        queue.hold(THEME_KEY);
        queue.hold(SOUND_KEY);
        ThemeStore {
            queue,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn initialize(&self) -> ThemeInit {
        let hydrated = self.read_inner().hydrated.clone();
        if let Some(init) = hydrated {
            return init;
        }

        let (dark_mode, theme) = match self.queue.load(THEME_KEY).await {
            Ok(Some(raw)) => match parse_mode(&raw) {
                Some(dark) => (Some(dark), LoadOutcome::Loaded),
                None => {
                    warn!(key = THEME_KEY, value = %raw, "Unrecognized theme mode");
                    let reason = format!("unrecognized theme mode '{}'", raw);
                    (None, LoadOutcome::Failed(reason))
                }
            },
            Ok(None) => (None, LoadOutcome::Missing),
            Err(e) => {
                warn!(key = THEME_KEY, error = %e, "Failed to load theme");
                (None, LoadOutcome::Failed(e.to_string()))
            }
        };
        let (sound_enabled, sound) = load_slice::<bool>(&self.queue, SOUND_KEY).await;

        let mut inner = self.write();
        if let Some(init) = inner.hydrated.clone() {
            return init;
        }
        // Parked writes mean the key was toggled before hydration
        if let Some(dark) = dark_mode.filter(|_| !self.queue.has_parked(THEME_KEY)) {
            inner.prefs.is_dark_mode = dark;
        }
        if let Some(enabled) = sound_enabled.filter(|_| !self.queue.has_parked(SOUND_KEY)) {
            inner.prefs.sound_enabled = enabled;
        }
        let init = ThemeInit { theme, sound };
        inner.hydrated = Some(init.clone());

        drop(
            self.queue
                .release(THEME_KEY, mode_name(inner.prefs.is_dark_mode).to_string()),
        );
        drop(self.queue.release_json(SOUND_KEY, &inner.prefs.sound_enabled));
        debug!(theme = ?init.theme, sound = ?init.sound, "Preferences loaded");
        init
    }

    pub fn preferences(&self) -> Preferences {
        self.read_inner().prefs
    }

    pub fn is_dark_mode(&self) -> bool {
        self.preferences().is_dark_mode
    }

    pub fn sound_enabled(&self) -> bool {
        self.preferences().sound_enabled
    }

    pub fn toggle_theme(&self) -> PersistHandle {
        let mut inner = self.write();
        inner.prefs.is_dark_mode = !inner.prefs.is_dark_mode;
        self.queue
            .enqueue_set(THEME_KEY, mode_name(inner.prefs.is_dark_mode).to_string())
    }

    pub fn set_dark_mode(&self, dark: bool) -> PersistHandle {
        let mut inner = self.write();
        inner.prefs.is_dark_mode = dark;
        self.queue.enqueue_set(THEME_KEY, mode_name(dark).to_string())
    }

    pub fn toggle_sound(&self) -> PersistHandle {
        let mut inner = self.write();
        inner.prefs.sound_enabled = !inner.prefs.sound_enabled;
        self.queue.enqueue_json(SOUND_KEY, &inner.prefs.sound_enabled)
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_kv::{KvStore, MemoryKvStore};

    fn store_over(backend: Arc<MemoryKvStore>) -> ThemeStore {
        ThemeStore::new(Arc::new(WriteQueue::new(backend)))
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let theme = store_over(Arc::new(MemoryKvStore::new()));
        let init = theme.initialize().await;

        assert_eq!(init.theme, LoadOutcome::Missing);
        assert_eq!(init.sound, LoadOutcome::Missing);
        assert!(!theme.is_dark_mode());
        assert!(theme.sound_enabled());
    }

    #[tokio::test]
    async fn test_toggles_persist_and_reload() {
        let backend = Arc::new(MemoryKvStore::new());
        let theme = store_over(backend.clone());
        theme.initialize().await;

        theme.toggle_theme().await.unwrap();
        theme.toggle_sound().await.unwrap();
        assert_eq!(backend.raw(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(backend.raw(SOUND_KEY).as_deref(), Some("false"));

        let reloaded = store_over(backend);
        let init = reloaded.initialize().await;
        assert_eq!(init.theme, LoadOutcome::Loaded);
        assert!(reloaded.is_dark_mode());
        assert!(!reloaded.sound_enabled());
    }

    #[tokio::test]
    async fn test_keys_load_independently() {
        let backend = Arc::new(MemoryKvStore::new());
        backend.set(THEME_KEY, "\"dark\"").await.unwrap();
        backend.set(SOUND_KEY, "maybe").await.unwrap();

        let theme = store_over(backend);
        let init = theme.initialize().await;
        assert_eq!(init.theme, LoadOutcome::Loaded);
        assert!(matches!(init.sound, LoadOutcome::Failed(_)));
        assert!(theme.is_dark_mode());
        assert!(theme.sound_enabled());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory() {
        let backend = Arc::new(MemoryKvStore::new());
        let theme = store_over(backend.clone());
        theme.initialize().await;
        backend.fail_writes(true);

        assert!(theme.set_dark_mode(true).await.is_err());
        assert!(theme.is_dark_mode());
        assert_eq!(backend.raw(THEME_KEY), None);
    }

    #[tokio::test]
    async fn test_toggle_before_initialize_wins_for_its_key() {
        let backend = Arc::new(MemoryKvStore::new());
        backend.set(THEME_KEY, "dark").await.unwrap();
        backend.set(SOUND_KEY, "false").await.unwrap();

        let theme = store_over(backend.clone());
        // Flips the default (light) before the stored value is known
        let toggled = theme.toggle_theme();
        let init = theme.initialize().await;
        toggled.await.unwrap();

        assert_eq!(init.theme, LoadOutcome::Loaded);
        assert!(theme.is_dark_mode());
        assert!(!theme.sound_enabled());
        assert_eq!(backend.raw(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(backend.raw(SOUND_KEY).as_deref(), Some("false"));
    }
}
