//! # App Error Type
//!
//! Unified error type for store actions the UI calls.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Hearth                                 │
//! │                                                                         │
//! │  CoreError ─────┐   insufficient funds, wrong code, bad input           │
//! │  KvError ───────┤   storage (usually reported as LoadOutcome instead)   │
//! │  GeoError ──────┼──► AppError ──► ErrorResponse { code, message } ──► UI│
//! │  config / io ───┤                                                       │
//! │  MissingUserId ─┘   UI navigates back, no banner                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is fatal and nothing is retried.

use hearth_core::{CoreError, ValidationError};
use hearth_geo::GeoError;
use hearth_kv::KvError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    #[error("Geocoding error: {0}")]
    Geo(#[from] GeoError),

    /// An action needed the signed-in user's id and there was none.
    #[error("No user id available")]
    MissingUserId,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// UI-Facing Shape
// =============================================================================

/// Machine-readable error codes.
///
/// ```typescript
/// switch (e.code) {
///   case 'MISSING_USER_ID': navigation.goBack(); break;
///   case 'INSUFFICIENT_FUNDS': showTopUp(); break;
///   default: showError(e.message);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientFunds,
    InvalidOperation,
    VerificationFailed,
    StorageError,
    GeocodingError,
    MissingUserId,
    ConfigError,
}

/// What the UI receives when an action fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Core(core) => match core {
                CoreError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
                CoreError::WalletNotLoaded | CoreError::InvalidTransaction { .. } => {
                    ErrorCode::InvalidOperation
                }
                CoreError::TransactionNotFound(_)
                | CoreError::ConversationNotFound(_)
                | CoreError::TicketNotFound(_) => ErrorCode::NotFound,
                CoreError::TicketExpired | CoreError::IncorrectCode { .. } => {
                    ErrorCode::VerificationFailed
                }
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            AppError::Storage(_) => ErrorCode::StorageError,
            AppError::Geo(_) => ErrorCode::GeocodingError,
            AppError::MissingUserId => ErrorCode::MissingUserId,
            AppError::Config(_) => ErrorCode::ConfigError,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            // Backend details go to the log, not the screen
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure surfaced to UI");
                "Could not save your changes".to_string()
            }
            other => other.to_string(),
        };
        ErrorResponse {
            code: self.code(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: AppError = CoreError::InsufficientFunds {
            balance_cents: 100,
            requested_cents: 500,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientFunds);

        let err: AppError = ValidationError::Required {
            field: "content".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.to_string(), "Validation error: content is required");

        assert_eq!(AppError::MissingUserId.code(), ErrorCode::MissingUserId);
    }

    #[test]
    fn test_response_serialization() {
        let response = AppError::MissingUserId.to_response();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "MISSING_USER_ID");
        assert_eq!(json["message"], "No user id available");

        let storage = AppError::Storage(KvError::Storage("disk I/O error".to_string()));
        assert_eq!(storage.to_response().message, "Could not save your changes");
    }
}
