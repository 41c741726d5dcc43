//! # Notification Platform
//!
//! The seam between the dispatcher and whatever shows alerts on the device.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Alert Channel Selection                              │
//! │                                                                         │
//! │  kind() == Web && permission == Granted ──► show_system_notification   │
//! │  kind() == Web && permission != Granted ──► show_dialog                │
//! │  kind() == Mobile ────────────────────────► show_dialog                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Web,
    #[default]
    Mobile,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Web => write!(f, "web"),
            PlatformKind::Mobile => write!(f, "mobile"),
        }
    }
}

impl FromStr for PlatformKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" | "browser" => Ok(PlatformKind::Web),
            "mobile" | "ios" | "android" => Ok(PlatformKind::Mobile),
            other => Err(AppError::Config(format!(
                "Unknown platform: '{}'. Valid options: web, mobile",
                other
            ))),
        }
    }
}

/// System notification permission, as browsers report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Not asked yet.
    #[default]
    Default,
}

/// How an alert was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    SystemNotification,
    Dialog,
}

#[derive(Debug, Clone, Error)]
#[error("Alert could not be shown: {0}")]
pub struct AlertError(pub String);

#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    async fn permission(&self) -> PermissionStatus;

    /// Prompts the user where the platform supports it.
    async fn request_permission(&self) -> PermissionStatus;

    async fn show_system_notification(&self, title: &str, body: &str) -> Result<(), AlertError>;

    /// Blocking in-app dialog.
    async fn show_dialog(&self, title: &str, body: &str) -> Result<(), AlertError>;
}

/// Picks the channel for the next alert.
pub fn alert_channel(kind: PlatformKind, permission: PermissionStatus) -> AlertChannel {
    match (kind, permission) {
        (PlatformKind::Web, PermissionStatus::Granted) => AlertChannel::SystemNotification,
        _ => AlertChannel::Dialog,
    }
}

// =============================================================================
// Logging Platform
// =============================================================================

/// Host default: writes alerts to the log.
///
/// Mobile hosts report `Granted`; web hosts start at `Default` and grant on
/// request.
#[derive(Debug)]
pub struct LoggingPlatform {
    kind: PlatformKind,
    permission: RwLock<PermissionStatus>,
}

impl LoggingPlatform {
    pub fn new(kind: PlatformKind) -> Self {
        let permission = match kind {
            PlatformKind::Mobile => PermissionStatus::Granted,
            PlatformKind::Web => PermissionStatus::Default,
        };
        LoggingPlatform {
            kind,
            permission: RwLock::new(permission),
        }
    }
}

#[async_trait]
impl NotificationPlatform for LoggingPlatform {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    async fn permission(&self) -> PermissionStatus {
        *self.permission.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_permission(&self) -> PermissionStatus {
        let mut permission = self.permission.write().unwrap_or_else(PoisonError::into_inner);
        if *permission == PermissionStatus::Default {
            *permission = PermissionStatus::Granted;
        }
        *permission
    }

    async fn show_system_notification(&self, title: &str, body: &str) -> Result<(), AlertError> {
        info!(channel = "system", title, body, "Notification");
        Ok(())
    }

    async fn show_dialog(&self, title: &str, body: &str) -> Result<(), AlertError> {
        info!(channel = "dialog", title, body, "Notification");
        Ok(())
    }
}

// =============================================================================
// Test Double
// =============================================================================
