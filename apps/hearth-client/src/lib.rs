//! # Hearth Client
//!
//! The state container the Hearth mobile UI binds to.
//!
//! ## Module Organization
//! ```text
//! hearth_client/
//! ├── lib.rs              ◄─── You are here (exports, logging setup)
//! ├── config.rs           ◄─── TOML config + HEARTH_* overrides
//! ├── error.rs            ◄─── AppError and the UI-facing ErrorResponse
//! ├── platform.rs         ◄─── NotificationPlatform seam (dialogs, system alerts)
//! └── state/
//!     ├── mod.rs          ◄─── AppState, storage keys, slice loading
//!     ├── favorites.rs    ◄─── Starred cooks (persisted)
//!     ├── notifications.rs◄─── Order notifications and alerts (persisted)
//!     ├── theme.rs        ◄─── Dark mode and sound (persisted)
//!     ├── verification.rs ◄─── Email/phone codes and trust badges (persisted)
//!     ├── payment.rs      ◄─── Wallet and transactions (memory)
//!     └── messaging.rs    ◄─── Conversations (memory)
//! ```
//!
//! ## Startup Sequence
//! 1. [`init_tracing`]
//! 2. [`ClientConfig::load_or_default`]
//! 3. [`AppState::from_config`] opens SQLite and the geocoder
//! 4. [`AppState::initialize`] hydrates every persisted store

pub mod config;
pub mod error;
pub mod platform;
pub mod state;

pub use config::ClientConfig;
pub use error::{AppError, AppResult, ErrorCode, ErrorResponse};
pub use platform::{
    AlertChannel, LoggingPlatform, NotificationPlatform, PermissionStatus, PlatformKind,
};
pub use state::{AppInit, AppState, LoadOutcome};

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "info,hearth_core=debug,hearth_kv=debug,hearth_geo=debug,hearth_client=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages everywhere
/// - `RUST_LOG=hearth_kv=trace` - Trace the storage layer only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
