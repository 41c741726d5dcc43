//! # Notification Records & Templates
//!
//! Records kept in the notification list, the user's notification settings,
//! and the fixed mapping from an order event to its banner text.
//!
//! ## Template Table
//! ```text
//! ┌──────────────┬────────────┬──────────────────────────────────────────┐
//! │ Event        │ Recipient  │ Title                                    │
//! ├──────────────┼────────────┼──────────────────────────────────────────┤
//! │ reserved     │ cook       │ 🍽️ New Order Received!                   │
//! │ reserved     │ customer   │ ✅ Reservation Placed                    │
//! │ confirmed    │ customer   │ 👨‍🍳 Order Confirmed!                      │
//! │ ready        │ customer   │ 🎉 Order Ready for Pickup!               │
//! │ (any other)  │            │ "" (record still created)                │
//! └──────────────┴────────────┴──────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Message, Reservation};

// =============================================================================
// Event & Recipient
// =============================================================================

/// The order event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NotificationType {
    Reserved,
    Confirmed,
    Ready,
}

/// Who the notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RecipientType {
    Cook,
    Customer,
}

// =============================================================================
// Notification
// =============================================================================

/// A user-facing order notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub reservation_id: String,
}

/// Gates for whether a dispatch happens at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationSettings {
    pub push_notifications: bool,
    pub order_updates: bool,
    pub message_notifications: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            push_notifications: true,
            order_updates: true,
            message_notifications: true,
        }
    }
}

impl NotificationSettings {
    /// Order events are delivered only when both switches are on.
    pub fn allows_order_updates(&self) -> bool {
        self.push_notifications && self.order_updates
    }

    pub fn allows_message_alerts(&self) -> bool {
        self.push_notifications && self.message_notifications
    }

    /// Applies a partial update; unset fields keep their value.
    pub fn apply(&mut self, patch: NotificationSettingsPatch) {
        if let Some(v) = patch.push_notifications {
            self.push_notifications = v;
        }
        if let Some(v) = patch.order_updates {
            self.order_updates = v;
        }
        if let Some(v) = patch.message_notifications {
            self.message_notifications = v;
        }
    }
}

/// Partial settings update from the settings screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationSettingsPatch {
    #[serde(default)]
    pub push_notifications: Option<bool>,
    #[serde(default)]
    pub order_updates: Option<bool>,
    #[serde(default)]
    pub message_notifications: Option<bool>,
}

// =============================================================================
// Templates
// =============================================================================

/// Rendered banner text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub title: String,
    pub body: String,
}

impl NotificationTemplate {
    /// True for event/recipient pairs with no defined text.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

fn portions(quantity: u32) -> &'static str {
    if quantity == 1 {
        "portion"
    } else {
        "portions"
    }
}

/// Renders the banner text for an order event.
///
/// Pairs outside the table render empty strings rather than failing.
pub fn order_template(
    kind: NotificationType,
    recipient: RecipientType,
    reservation: &Reservation,
) -> NotificationTemplate {
    let (title, body) = match (kind, recipient) {
        (NotificationType::Reserved, RecipientType::Cook) => (
            "🍽️ New Order Received!".to_string(),
            format!(
                "{} reserved {} {} of {}",
                reservation.customer_name,
                reservation.quantity,
                portions(reservation.quantity),
                reservation.meal_name
            ),
        ),
        (NotificationType::Reserved, RecipientType::Customer) => (
            "✅ Reservation Placed".to_string(),
            format!(
                "You reserved {} {} of {}. Waiting for {} to confirm.",
                reservation.quantity,
                portions(reservation.quantity),
                reservation.meal_name,
                reservation.cook_name
            ),
        ),
        (NotificationType::Confirmed, RecipientType::Customer) => (
            "👨‍🍳 Order Confirmed!".to_string(),
            format!(
                "{} confirmed your order of {}",
                reservation.cook_name, reservation.meal_name
            ),
        ),
        (NotificationType::Ready, RecipientType::Customer) => (
            "🎉 Order Ready for Pickup!".to_string(),
            format!(
                "Your {} from {} is ready for pickup",
                reservation.meal_name, reservation.cook_name
            ),
        ),
        _ => (String::new(), String::new()),
    };

    NotificationTemplate { title, body }
}

/// Preview length for message alerts.
const MESSAGE_PREVIEW_CHARS: usize = 80;

/// Renders the banner text for an incoming chat message.
pub fn message_template(message: &Message, sender_name: &str) -> NotificationTemplate {
    let mut preview: String = message.content.chars().take(MESSAGE_PREVIEW_CHARS).collect();
    if message.content.chars().count() > MESSAGE_PREVIEW_CHARS {
        preview.push('…');
    }
    NotificationTemplate {
        title: format!("💬 {}", sender_name),
        body: preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn reservation(quantity: u32) -> Reservation {
        Reservation {
            id: "res-1".to_string(),
            meal_id: "meal-1".to_string(),
            meal_name: "Jollof Rice".to_string(),
            cook_id: "cook-1".to_string(),
            cook_name: "Ama".to_string(),
            customer_id: "cust-1".to_string(),
            customer_name: "Tom".to_string(),
            quantity,
            total_price: Money::from_cents(2400),
            pickup_time: None,
            status: Default::default(),
        }
    }

    #[test]
    fn test_reserved_for_cook_mentions_quantity() {
        let t = order_template(NotificationType::Reserved, RecipientType::Cook, &reservation(3));
        assert_eq!(t.title, "🍽️ New Order Received!");
        assert!(t.body.contains('3'));
        assert_eq!(t.body, "Tom reserved 3 portions of Jollof Rice");

        let single = order_template(NotificationType::Reserved, RecipientType::Cook, &reservation(1));
        assert_eq!(single.body, "Tom reserved 1 portion of Jollof Rice");
    }

    #[test]
    fn test_undefined_pairs_render_empty() {
        let r = reservation(2);
        for (kind, recipient) in [
            (NotificationType::Confirmed, RecipientType::Cook),
            (NotificationType::Ready, RecipientType::Cook),
        ] {
            assert!(order_template(kind, recipient, &r).is_empty());
        }
        assert!(!order_template(NotificationType::Ready, RecipientType::Customer, &r).is_empty());
    }

    #[test]
    fn test_settings_gates() {
        let mut settings = NotificationSettings::default();
        assert!(settings.allows_order_updates());

        settings.apply(NotificationSettingsPatch {
            push_notifications: Some(false),
            ..Default::default()
        });
        assert!(!settings.allows_order_updates());
        assert!(!settings.allows_message_alerts());
        assert!(settings.order_updates);
    }

    #[test]
    fn test_settings_json_shape() {
        let json = serde_json::to_string(&NotificationSettings::default()).unwrap();
        assert_eq!(
            json,
            r#"{"pushNotifications":true,"orderUpdates":true,"messageNotifications":true}"#
        );
    }

    #[test]
    fn test_message_preview_truncates() {
        let message = Message {
            id: "m1".to_string(),
            conversation_id: "c".to_string(),
            sender_id: "a".to_string(),
            receiver_id: "b".to_string(),
            content: "x".repeat(100),
            created_at: Utc::now(),
            read: false,
        };
        let t = message_template(&message, "Ama");
        assert_eq!(t.title, "💬 Ama");
        assert_eq!(t.body.chars().count(), MESSAGE_PREVIEW_CHARS + 1);
    }
}
