//! # Notifications Store
//!
//! Order notifications, the settings that gate them, and the dispatcher that
//! turns reservation events into stored records plus an on-screen alert.
//!
//! ## Dispatch Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  send_order_notification(kind, reservation, recipient)                  │
//! │                                                                         │
//! │  push_notifications && order_updates ? ──no──► Suppressed              │
//! │        │ yes                                                            │
//! │        ▼                                                                │
//! │  1. record  { id: "{millis}-{suffix}", template(kind, recipient) }      │
//! │  2. prepend to list (newest first)                                      │
//! │  3. enqueue "localNotifications" write ──► PersistHandle                │
//! │  4. alert: web + Granted ──► system notification                        │
//! │            otherwise     ──► dialog                                     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Delivered { notification, alert: Shown | Failed, persist }             │
//! │  (an alert failure never undoes 1-3)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! `Uninitialized ──initialize()──► Loading ──► Ready`. The store reaches
//! `Ready` whatever the individual loads report.
//!
//! Writes stay parked in the queue until `Ready`. Notifications dispatched
//! earlier are kept ahead of the stored list, and early read marks, clears
//! and settings patches are replayed onto what was loaded.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use hearth_core::notification::{message_template, order_template};
use hearth_core::{
    Message, Notification, NotificationSettings, NotificationSettingsPatch, NotificationTemplate,
    NotificationType, RecipientType, Reservation,
};
use hearth_kv::{PersistHandle, WriteQueue};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{load_slice, LoadOutcome, NOTIFICATIONS_KEY, NOTIFICATION_SETTINGS_KEY};
use crate::platform::{alert_channel, AlertChannel, NotificationPlatform, PermissionStatus};

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// What [`NotificationsStore::initialize`] found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsInit {
    pub settings: LoadOutcome,
    pub notifications: LoadOutcome,
    pub permission: PermissionStatus,
    /// True when the store was already `Ready` and nothing was reloaded.
    pub already_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum AlertOutcome {
    Shown(AlertChannel),
    Failed(String),
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// Settings blocked the event; nothing stored, nothing shown.
    Suppressed,
    Delivered {
        notification: Notification,
        alert: AlertOutcome,
        persist: PersistHandle,
    },
}

impl DispatchOutcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, DispatchOutcome::Suppressed)
    }

    pub fn notification(&self) -> Option<&Notification> {
        match self {
            DispatchOutcome::Delivered { notification, .. } => Some(notification),
            DispatchOutcome::Suppressed => None,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Default)]
struct Inner {
    notifications: Vec<Notification>,
    settings: NotificationSettings,
    permission: PermissionStatus,
    lifecycle: Lifecycle,
    last_init: Option<NotificationsInit>,
    early: EarlyActions,
}

/// Actions taken before `Ready`, replayed onto the loaded slices.
#[derive(Debug, Default)]
struct EarlyActions {
    read: HashSet<String>,
    all_read: bool,
    cleared: bool,
    settings: Vec<NotificationSettingsPatch>,
}

impl Inner {
    fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    fn already_ready(&self) -> Option<NotificationsInit> {
        let previous = self.last_init.as_ref().filter(|_| self.is_ready())?;
        Some(NotificationsInit {
            already_ready: true,
            ..previous.clone()
        })
    }

    fn merge_loaded(
        &mut self,
        list: Option<Vec<Notification>>,
        settings: Option<NotificationSettings>,
    ) {
        let early = std::mem::take(&mut self.early);

        if let Some(loaded) = list.filter(|_| !early.cleared) {
            for mut n in loaded {
                if self.notifications.iter().any(|m| m.id == n.id) {
                    continue;
                }
                if early.all_read || early.read.contains(&n.id) {
                    n.read = true;
                }
                self.notifications.push(n);
            }
        }

        if let Some(mut loaded) = settings {
            for patch in early.settings {
                loaded.apply(patch);
            }
            self.settings = loaded;
        }
    }
}

pub struct NotificationsStore {
    queue: Arc<WriteQueue>,
    platform: Arc<dyn NotificationPlatform>,
    inner: RwLock<Inner>,
}

/// `{millis}-{9 chars}`, unique enough for on-device records.
fn notification_id() -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

impl NotificationsStore {
    pub fn new(queue: Arc<WriteQueue>, platform: Arc<dyn NotificationPlatform>) -> Self {
        queue.hold(NOTIFICATIONS_KEY);
        queue.hold(NOTIFICATION_SETTINGS_KEY);
        NotificationsStore {
            queue,
            platform,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn initialize(&self) -> NotificationsInit {
        {
            let mut inner = self.write();
            if let Some(previous) = inner.already_ready() {
                return previous;
            }
            inner.lifecycle = Lifecycle::Loading;
        }

        let (settings, settings_outcome) =
            load_slice::<NotificationSettings>(&self.queue, NOTIFICATION_SETTINGS_KEY).await;
        let (list, list_outcome) =
            load_slice::<Vec<Notification>>(&self.queue, NOTIFICATIONS_KEY).await;
        let permission = self.platform.permission().await;

        let report = NotificationsInit {
            settings: settings_outcome,
            notifications: list_outcome,
            permission,
            already_ready: false,
        };

        let mut inner = self.write();
        // A concurrent initialize got here first
        if let Some(previous) = inner.already_ready() {
            return previous;
        }
        inner.merge_loaded(list, settings);
        inner.permission = permission;
        inner.lifecycle = Lifecycle::Ready;
        inner.last_init = Some(report.clone());

        drop(
            self.queue
                .release_json(NOTIFICATIONS_KEY, &inner.notifications),
        );
        drop(
            self.queue
                .release_json(NOTIFICATION_SETTINGS_KEY, &inner.settings),
        );

        info!(
            count = inner.notifications.len(),
            ?permission,
            "Notifications ready"
        );
        report
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub async fn send_order_notification(
        &self,
        kind: NotificationType,
        reservation: &Reservation,
        recipient: RecipientType,
    ) -> DispatchOutcome {
        let (notification, persist, channel) = {
            let mut inner = self.write();
            if !inner.settings.allows_order_updates() {
                debug!(?kind, reservation_id = %reservation.id, "Order notification suppressed");
                return DispatchOutcome::Suppressed;
            }

            let template = order_template(kind, recipient, reservation);
            if template.is_empty() {
                warn!(?kind, ?recipient, "No template for event; storing empty notification");
            }

            let notification = Notification {
                id: notification_id(),
                title: template.title,
                body: template.body,
                timestamp: Utc::now(),
                read: false,
                kind,
                reservation_id: reservation.id.clone(),
            };

            inner.notifications.insert(0, notification.clone());
            let persist = self
                .queue
                .enqueue_json(NOTIFICATIONS_KEY, &inner.notifications);
            let channel = alert_channel(self.platform.kind(), inner.permission);
            (notification, persist, channel)
        };

        let alert = self
            .present(channel, &notification.title, &notification.body)
            .await;

        DispatchOutcome::Delivered {
            notification,
            alert,
            persist,
        }
    }

    /// Alert-only: chat messages are not kept in the notification list.
    ///
    /// Returns `None` when settings suppress message alerts.
    pub async fn send_message_notification(
        &self,
        message: &Message,
        sender_name: &str,
    ) -> Option<AlertOutcome> {
        let channel = {
            let inner = self.read();
            if !inner.settings.allows_message_alerts() {
                debug!(message_id = %message.id, "Message alert suppressed");
                return None;
            }
            alert_channel(self.platform.kind(), inner.permission)
        };

        let NotificationTemplate { title, body } = message_template(message, sender_name);
        Some(self.present(channel, &title, &body).await)
    }

    async fn present(&self, channel: AlertChannel, title: &str, body: &str) -> AlertOutcome {
        let result = match channel {
            AlertChannel::SystemNotification => {
                self.platform.show_system_notification(title, body).await
            }
            AlertChannel::Dialog => self.platform.show_dialog(title, body).await,
        };

        match result {
            Ok(()) => AlertOutcome::Shown(channel),
            Err(e) => {
                warn!(?channel, error = %e, "Alert failed");
                AlertOutcome::Failed(e.to_string())
            }
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Unknown ids and already-read notifications change nothing.
    pub fn mark_as_read(&self, id: &str) -> PersistHandle {
        let mut inner = self.write();
        if !inner.is_ready() {
            // The id may belong to the list not read yet
            if let Some(n) = inner.notifications.iter_mut().find(|n| n.id == id) {
                n.read = true;
            }
            inner.early.read.insert(id.to_string());
            return self.queue.enqueue_json(NOTIFICATIONS_KEY, &inner.notifications);
        }

        match inner.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.read => n.read = true,
            _ => return PersistHandle::skipped(),
        }
        self.queue.enqueue_json(NOTIFICATIONS_KEY, &inner.notifications)
    }

    pub fn mark_all_as_read(&self) -> PersistHandle {
        let mut inner = self.write();
        if !inner.is_ready() {
            inner.notifications.iter_mut().for_each(|n| n.read = true);
            inner.early.all_read = true;
            return self.queue.enqueue_json(NOTIFICATIONS_KEY, &inner.notifications);
        }

        let mut changed = false;
        for n in inner.notifications.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed = true;
        }
        if !changed {
            return PersistHandle::skipped();
        }
        self.queue.enqueue_json(NOTIFICATIONS_KEY, &inner.notifications)
    }

    pub fn clear_notifications(&self) -> PersistHandle {
        let mut inner = self.write();
        inner.notifications.clear();
        if !inner.is_ready() {
            let settings = std::mem::take(&mut inner.early.settings);
            inner.early = EarlyActions {
                cleared: true,
                settings,
                ..EarlyActions::default()
            };
        }
        self.queue.enqueue_json(NOTIFICATIONS_KEY, &inner.notifications)
    }

    pub fn update_settings(&self, patch: NotificationSettingsPatch) -> PersistHandle {
        let mut inner = self.write();
        inner.settings.apply(patch);
        if !inner.is_ready() {
            inner.early.settings.push(patch);
        }
        debug!(settings = ?inner.settings, "Notification settings updated");
        self.queue
            .enqueue_json(NOTIFICATION_SETTINGS_KEY, &inner.settings)
    }

    /// Asks the platform and caches the answer for alert routing.
    pub async fn request_permission(&self) -> PermissionStatus {
        let permission = self.platform.request_permission().await;
        self.write().permission = permission;
        info!(?permission, "Notification permission");
        permission
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.read().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.read().notifications.iter().filter(|n| !n.read).count()
    }

    pub fn settings(&self) -> NotificationSettings {
        self.read().settings
    }

    pub fn permission(&self) -> PermissionStatus {
        self.read().permission
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.read().lifecycle
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
