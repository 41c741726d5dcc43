//! # Error Types
//!
//! Domain-specific error types for hearth-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hearth-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hearth-kv errors                                                      │
//! │  └── KvError          - Storage read/write failures                    │
//! │                                                                         │
//! │  hearth-geo errors                                                     │
//! │  └── GeoError         - Geocoding request failures                     │
//! │                                                                         │
//! │  hearth-client errors                                                  │
//! │  └── AppError         - What the UI sees (serialized, with a code)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by store actions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The wallet does not hold enough to cover a payment.
    #[error("Insufficient funds: balance {balance_cents}, requested {requested_cents}")]
    InsufficientFunds {
        balance_cents: i64,
        requested_cents: i64,
    },

    /// No wallet has been loaded for the current user.
    #[error("Wallet not loaded")]
    WalletNotLoaded,

    /// Transaction cannot be found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Refunding a transaction that is not a completed payment
    /// - Refunding the same payment twice
    #[error("Transaction {transaction_id} cannot be {operation}: {reason}")]
    InvalidTransaction {
        transaction_id: String,
        operation: String,
        reason: String,
    },

    /// Conversation cannot be found.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// Verification ticket cannot be found (unknown, expired or exhausted).
    #[error("Verification ticket not found: {0}")]
    TicketNotFound(String),

    /// Verification ticket has expired.
    #[error("Verification code expired")]
    TicketExpired,

    /// Submitted verification code does not match.
    #[error("Incorrect verification code ({remaining} attempts left)")]
    IncorrectCode { remaining: u32 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientFunds {
            balance_cents: 500,
            requested_cents: 1200,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: balance 500, requested 1200"
        );

        let err = CoreError::IncorrectCode { remaining: 2 };
        assert_eq!(err.to_string(), "Incorrect verification code (2 attempts left)");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "content".to_string(),
        };
        assert_eq!(err.to_string(), "content is required");

        let err = ValidationError::TooLong {
            field: "content".to_string(),
            max: 2000,
        };
        assert_eq!(err.to_string(), "content must be at most 2000 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
