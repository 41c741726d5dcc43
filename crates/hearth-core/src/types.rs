//! # Domain Types
//!
//! Records shared by the client stores and the UI.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Cook       │   │   Reservation   │   │   Transaction   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name           │◄──│  cook_id        │   │  from_user_id   │       │
//! │  │  cuisine        │   │  customer_id    │   │  to_user_id     │       │
//! │  │  rating         │   │  quantity       │   │  amount (Money) │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Conversation   │   │     Message     │   │  Verification   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  participants   │◄──│  conversation_id│   │  email status   │       │
//! │  │  last_message   │   │  content        │   │  phone status   │       │
//! │  │  unread_count   │   │  created_at     │   │  badges         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All records serialize camelCase: that is the shape the UI and the
//! on-device storage blobs use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cook
// =============================================================================

/// A marketplace seller offering meals for pickup.
///
/// Favorites hold full copies of this record, not references, so a favorite
/// still renders if the cook later disappears from search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub cuisine: Vec<String>,
    /// Average review score, 0.0 - 5.0.
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub distance_km: Option<f32>,
    #[serde(default)]
    pub verified: bool,
}

// =============================================================================
// Reservation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Ready,
    Completed,
    Cancelled,
}

/// An order placed by a customer against a cook's meal listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub meal_id: String,
    pub meal_name: String,
    pub cook_id: String,
    pub cook_name: String,
    pub customer_id: String,
    pub customer_name: String,
    /// Number of portions reserved.
    pub quantity: u32,
    pub total_price: Money,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub pickup_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ReservationStatus,
}

// =============================================================================
// Wallet & Transactions
// =============================================================================

/// A user's in-app balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Wallet {
    pub user_id: String,
    pub balance: Money,
    /// Lifetime sum of completed outgoing payments, net of refunds.
    pub total_spent: Money,
}

impl Wallet {
    /// Creates an empty wallet for a user.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Wallet {
            user_id: user_id.into(),
            balance: Money::zero(),
            total_spent: Money::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TransactionType {
    /// Customer pays a cook for a reservation.
    Payment,
    /// A payment returned to the customer.
    Refund,
    /// Funds added to the wallet.
    TopUp,
    /// Cook withdraws earnings.
    Payout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A money movement between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns true if `user_id` sent or received this transaction.
    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }
}

// =============================================================================
// Messaging
// =============================================================================

/// A single chat message between a customer and a cook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// A two-party conversation as shown in the inbox list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Conversation {
    pub id: String,
    pub participants: [String; 2],
    /// Cached copy of the newest message, for list rendering.
    pub last_message: Option<Message>,
    pub unread_count: u32,
}

impl Conversation {
    /// Deterministic conversation id for a pair of users.
    ///
    /// The lesser id is length-prefixed, so ids that contain `_` cannot
    /// collide: `("a", "b_c")` and `("a_b", "c")` get different ids.
    ///
    /// ```rust
    /// use hearth_core::Conversation;
    ///
    /// assert_eq!(
    ///     Conversation::id_for("cook-2", "cust-9"),
    ///     Conversation::id_for("cust-9", "cook-2"),
    /// );
    /// assert_eq!(Conversation::id_for("cust-9", "cook-2"), "conv_6:cook-2_cust-9");
    /// ```
    pub fn id_for(a: &str, b: &str) -> String {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        format!("conv_{}:{}_{}", first.len(), first, second)
    }

    /// Creates an empty conversation between two users.
    pub fn between(a: &str, b: &str) -> Self {
        let mut participants = [a.to_string(), b.to_string()];
        participants.sort();
        Conversation {
            id: Conversation::id_for(a, b),
            participants,
            last_message: None,
            unread_count: 0,
        }
    }

    /// Returns the participant that is not `user_id`.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(String::as_str)
    }

    /// Recomputes `last_message` from the full message list.
    ///
    /// Ties on `created_at` resolve to the message inserted last.
    pub fn refresh_last_message(&mut self, messages: &[Message]) {
        self.last_message = messages
            .iter()
            .enumerate()
            .max_by_key(|(idx, m)| (m.created_at, *idx))
            .map(|(_, m)| m.clone());
    }
}

// =============================================================================
// Verification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VerificationChannel {
    Email,
    Phone,
}

impl std::fmt::Display for VerificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationChannel::Email => write!(f, "email"),
            VerificationChannel::Phone => write!(f, "phone"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Pending,
    Verified,
}

/// Trust badges shown on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TrustBadge {
    EmailVerified,
    PhoneVerified,
    /// Both channels verified.
    TrustedMember,
}

/// Per-user verification state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VerificationProfile {
    pub user_id: String,
    #[serde(default)]
    pub email: VerificationStatus,
    #[serde(default)]
    pub phone: VerificationStatus,
}

impl VerificationProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        VerificationProfile {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn status(&self, channel: VerificationChannel) -> VerificationStatus {
        match channel {
            VerificationChannel::Email => self.email,
            VerificationChannel::Phone => self.phone,
        }
    }

    pub fn set_status(&mut self, channel: VerificationChannel, status: VerificationStatus) {
        match channel {
            VerificationChannel::Email => self.email = status,
            VerificationChannel::Phone => self.phone = status,
        }
    }

    /// Derives the badges this profile has earned.
    pub fn badges(&self) -> Vec<TrustBadge> {
        let email = self.email == VerificationStatus::Verified;
        let phone = self.phone == VerificationStatus::Verified;

        let mut badges = Vec::new();
        if email {
            badges.push(TrustBadge::EmailVerified);
        }
        if phone {
            badges.push(TrustBadge::PhoneVerified);
        }
        if email && phone {
            badges.push(TrustBadge::TrustedMember);
        }
        badges
    }
}

/// An outstanding verification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationTicket {
    pub id: String,
    pub user_id: String,
    pub channel: VerificationChannel,
    /// Email address or phone number the code was sent to.
    pub target: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

impl VerificationTicket {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(id: &str, offset_secs: i64) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "conv".to_string(),
            sender_id: "a".to_string(),
            receiver_id: "b".to_string(),
            content: format!("msg {}", id),
            created_at: DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(offset_secs),
            read: false,
        }
    }

    #[test]
    fn test_conversation_id_is_order_independent() {
        let conv = Conversation::between("zed", "amy");
        assert_eq!(conv.participants, ["amy".to_string(), "zed".to_string()]);
        assert_eq!(conv.id, Conversation::id_for("zed", "amy"));
        assert_eq!(conv.other_participant("amy"), Some("zed"));
    }

    #[test]
    fn test_conversation_ids_with_underscores_do_not_collide() {
        assert_ne!(
            Conversation::id_for("a", "b_c"),
            Conversation::id_for("a_b", "c")
        );
        assert_ne!(
            Conversation::id_for("user_1", "x"),
            Conversation::id_for("user", "1_x")
        );
        assert_eq!(
            Conversation::id_for("b_c", "a"),
            Conversation::id_for("a", "b_c")
        );
    }

    #[test]
    fn test_refresh_last_message_picks_newest_by_time() {
        let mut conv = Conversation::between("a", "b");
        let messages = vec![message("1", 10), message("3", 30), message("2", 20)];
        conv.refresh_last_message(&messages);
        assert_eq!(conv.last_message.unwrap().id, "3");

        let mut empty = Conversation::between("a", "b");
        empty.refresh_last_message(&[]);
        assert!(empty.last_message.is_none());
    }

    #[test]
    fn test_badges() {
        let mut profile = VerificationProfile::new("u1");
        assert!(profile.badges().is_empty());

        profile.set_status(VerificationChannel::Email, VerificationStatus::Verified);
        assert_eq!(profile.badges(), vec![TrustBadge::EmailVerified]);

        profile.set_status(VerificationChannel::Phone, VerificationStatus::Verified);
        assert_eq!(
            profile.badges(),
            vec![
                TrustBadge::EmailVerified,
                TrustBadge::PhoneVerified,
                TrustBadge::TrustedMember
            ]
        );
    }

    #[test]
    fn test_transaction_type_serializes_as_type() {
        let tx = Transaction {
            id: "tx1".to_string(),
            from_user_id: "cust".to_string(),
            to_user_id: "cook".to_string(),
            amount: Money::from_cents(1200),
            kind: TransactionType::TopUp,
            status: TransactionStatus::Completed,
            description: "Top up".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "top_up");
        assert_eq!(json["fromUserId"], "cust");
        assert_eq!(json["amount"], 1200);
        assert!(tx.involves("cook"));
        assert!(!tx.involves("someone"));
    }
}
