//! # hearth-core: Pure Domain Logic for Hearth
//!
//! Records, money, validation and notification templates for the Hearth
//! home-cook marketplace client. Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hearth Client Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Mobile UI (React Native)                       │   │
//! │  │   Browse ──► Cook Profile ──► Reserve ──► Chat ──► Wallet       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            hearth-client (stores + AppState)                    │   │
//! │  └──────┬──────────────────────┬──────────────────────┬────────────┘   │
//! │         │                      │                      │                 │
//! │  ┌──────▼──────────┐   ┌───────▼────────┐   ┌─────────▼────────┐       │
//! │  │ ★ hearth-core ★ │   │   hearth-kv    │   │   hearth-geo     │       │
//! │  │ types, money,   │   │ on-device KV   │   │ geocoding HTTP   │       │
//! │  │ validation      │   │ + write queue  │   │ + normalization  │       │
//! │  └─────────────────┘   └────────────────┘   └──────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Cook, Reservation, Wallet, Transaction, Conversation, Message, Verification
//! - [`notification`] - Notification records, settings and banner templates
//! - [`money`] - Integer-cent money
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation and the offline address heuristic

pub mod error;
pub mod money;
pub mod notification;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use notification::{
    Notification, NotificationSettings, NotificationSettingsPatch, NotificationTemplate,
    NotificationType, RecipientType,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a chat message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Wrong-code submissions allowed before a verification ticket is discarded.
pub const MAX_VERIFICATION_ATTEMPTS: u32 = 5;

/// Lifetime of a verification code.
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 10;

/// Fresh random identifier for client-created records.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
