//! # State Module
//!
//! The domain stores the UI binds to, and the [`AppState`] container that
//! owns them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                          AppState                               │   │
//! │  │  favorites  notifications  theme  payment  messaging  verify    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │          │ persisted slices                       │ in memory only     │
//! │          ▼                                        ▼                     │
//! │  ┌──────────────┐                      payment, messaging              │
//! │  │  WriteQueue  │  one ordered worker per key                          │
//! │  └──────┬───────┘                                                       │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────┐                                       │
//! │  │ Namespaced<SqliteKvStore>    │  `hearth:favorites-storage`, ...      │
//! │  └──────────────────────────────┘                                       │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Each store guards its own state with a std RwLock                   │
//! │  • Locks are never held across an await                                │
//! │  • Writes are enqueued under the lock, so storage sees mutation order  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod favorites;
mod messaging;
mod notifications;
mod payment;
mod theme;
mod verification;

pub use favorites::FavoritesStore;
pub use messaging::MessagingStore;
pub use notifications::{
    AlertOutcome, DispatchOutcome, Lifecycle, NotificationsInit, NotificationsStore,
};
pub use payment::{PaymentStore, TOP_UP_SOURCE};
pub use theme::{Preferences, ThemeInit, ThemeStore};
pub use verification::{StartedVerification, VerificationStore};

use std::sync::Arc;

use hearth_core::Message;
use hearth_geo::{AddressValidator, Geocoder, NominatimGeocoder};
use hearth_kv::{KvConfig, KvResult, KvStore, Namespaced, SqliteKvStore, WriteQueue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::platform::{LoggingPlatform, NotificationPlatform};

// =============================================================================
// Storage Keys
// =============================================================================

pub const FAVORITES_KEY: &str = "favorites-storage";
pub const NOTIFICATION_SETTINGS_KEY: &str = "notificationSettings";
pub const NOTIFICATIONS_KEY: &str = "localNotifications";
pub const THEME_KEY: &str = "@theme_mode";
pub const SOUND_KEY: &str = "@sound_enabled";
pub const VERIFICATION_KEY: &str = "verification-storage";

// =============================================================================
// Loading
// =============================================================================

/// Result of hydrating one persisted slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum LoadOutcome {
    Loaded,
    /// Nothing stored yet; defaults apply.
    Missing,
    /// Unreadable or corrupt; defaults apply and the blob is left as is.
    Failed(String),
}

impl LoadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadOutcome::Failed(_))
    }
}

/// `{ "state": ..., "version": 0 }` wrapper used by envelope-style slices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistEnvelope<T> {
    pub state: T,
    #[serde(default)]
    pub version: u32,
}

impl<T> PersistEnvelope<T> {
    pub fn new(state: T) -> Self {
        PersistEnvelope { state, version: 0 }
    }
}

/// Reads one JSON slice once the writes already queued for it have landed.
pub(crate) async fn load_slice<T: DeserializeOwned>(
    queue: &WriteQueue,
    key: &str,
) -> (Option<T>, LoadOutcome) {
    let raw = match queue.load(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return (None, LoadOutcome::Missing),
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted state");
            return (None, LoadOutcome::Failed(e.to_string()));
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => (Some(value), LoadOutcome::Loaded),
        Err(e) => {
            warn!(key, error = %e, "Persisted state is corrupt; using defaults");
            (None, LoadOutcome::Failed(e.to_string()))
        }
    }
}

// =============================================================================
// App State
// =============================================================================

/// What every store found at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInit {
    pub favorites: LoadOutcome,
    pub notifications: NotificationsInit,
    pub theme: ThemeInit,
    pub verification: LoadOutcome,
}

impl AppInit {
    pub fn has_failures(&self) -> bool {
        [
            &self.favorites,
            &self.notifications.settings,
            &self.notifications.notifications,
            &self.theme.theme,
            &self.theme.sound,
            &self.verification,
        ]
        .iter()
        .any(|outcome| outcome.is_failed())
    }
}

pub struct AppState {
    queue: Arc<WriteQueue>,
    favorites: FavoritesStore,
    notifications: NotificationsStore,
    theme: ThemeStore,
    payment: PaymentStore,
    messaging: MessagingStore,
    verification: VerificationStore,
    addresses: AddressValidator,
    platform: Arc<dyn NotificationPlatform>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KvStore>,
        platform: Arc<dyn NotificationPlatform>,
        geocoder: Arc<dyn Geocoder>,
        user_id: Option<String>,
        result_limit: usize,
    ) -> Self {
        let queue = Arc::new(WriteQueue::new(store));
        AppState {
            favorites: FavoritesStore::new(queue.clone()),
            notifications: NotificationsStore::new(queue.clone(), platform.clone()),
            theme: ThemeStore::new(queue.clone()),
            payment: PaymentStore::new(),
            messaging: MessagingStore::new(user_id),
            verification: VerificationStore::new(queue.clone()),
            addresses: AddressValidator::new(geocoder, result_limit),
            platform,
            queue,
        }
    }

    /// Opens the SQLite file and geocoder named by `config`.
    pub async fn from_config(config: &ClientConfig) -> AppResult<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(?db_path, "Opening storage");

        let sqlite = SqliteKvStore::open(KvConfig::new(db_path)).await?;
        let store: Arc<dyn KvStore> =
            Arc::new(Namespaced::new(sqlite, &config.storage.namespace));

        let geocoder_config = config.geocoder_config();
        let result_limit = geocoder_config.result_limit;
        let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(geocoder_config)?);

        let platform: Arc<dyn NotificationPlatform> =
            Arc::new(LoggingPlatform::new(config.notifications.platform));

        Ok(Self::new(
            store,
            platform,
            geocoder,
            config.user_id().map(str::to_string),
            result_limit,
        ))
    }

    /// Hydrates every persisted store concurrently.
    pub async fn initialize(&self) -> AppInit {
        let (favorites, notifications, theme, verification) = tokio::join!(
            self.favorites.initialize(),
            self.notifications.initialize(),
            self.theme.initialize(),
            self.verification.initialize(),
        );

        let init = AppInit {
            favorites,
            notifications,
            theme,
            verification,
        };
        if init.has_failures() {
            warn!(?init, "Some persisted state could not be loaded");
        } else {
            debug!("All stores hydrated");
        }
        init
    }

    /// Stores an incoming chat message and alerts when it is for the
    /// signed-in user. Duplicates are dropped silently.
    pub async fn deliver_incoming_message(
        &self,
        message: Message,
        sender_name: &str,
    ) -> Option<AlertOutcome> {
        let for_me = self.messaging.current_user().as_deref() == Some(message.receiver_id.as_str());
        if !self.messaging.receive_message(message.clone()) || !for_me {
            return None;
        }
        self.notifications
            .send_message_notification(&message, sender_name)
            .await
    }

    /// Waits for every queued write to land. Writes made before
    /// [`AppState::initialize`] stay parked until it has run.
    pub async fn flush(&self) -> KvResult<()> {
        self.queue.flush().await
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn notifications(&self) -> &NotificationsStore {
        &self.notifications
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    pub fn payment(&self) -> &PaymentStore {
        &self.payment
    }

    pub fn messaging(&self) -> &MessagingStore {
        &self.messaging
    }

    pub fn verification(&self) -> &VerificationStore {
        &self.verification
    }

    pub fn addresses(&self) -> &AddressValidator {
        &self.addresses
    }

    pub fn platform(&self) -> &Arc<dyn NotificationPlatform> {
        &self.platform
    }
}
