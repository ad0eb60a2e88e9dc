//! Ledger Error Types
//!
//! One taxonomy for every command the engine accepts. Callers must be able to
//! tell three situations apart:
//!
//! - rejected, nothing happened: every variant except `StorageFailure`
//! - already happened: not an error, see [`crate::transfer::CommandOutcome::Replayed`]
//! - transient failure, safe to retry with the same key: `StorageFailure`

use thiserror::Error;

use crate::account::validation::ValidationError;
use crate::money::MoneyError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Value must be greater than zero")]
    InvalidValue,

    #[error("Invalid movement kind: {0}")]
    InvalidKind(String),

    #[error("Invalid idempotency key: {0}")]
    InvalidKey(String),

    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    // === Account Errors ===
    #[error("Account not found or inactive")]
    InvalidAccount,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Identity already registered: {0}")]
    DuplicateIdentity(String),

    // === Balance Errors ===
    #[error("Insufficient balance")]
    InsufficientBalance,

    // === System Errors ===
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl LedgerError {
    /// Stable error code for API responses and log queries
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidValue => "INVALID_VALUE",
            LedgerError::InvalidKind(_) => "INVALID_KIND",
            LedgerError::InvalidKey(_) => "INVALID_KEY",
            LedgerError::SameAccount => "SAME_ACCOUNT",
            LedgerError::Validation(_) => "INVALID_INPUT",
            LedgerError::InvalidAccount => "INVALID_ACCOUNT",
            LedgerError::InvalidCredential => "INVALID_CREDENTIAL",
            LedgerError::DuplicateIdentity(_) => "DUPLICATE_IDENTITY",
            LedgerError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            LedgerError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }

    /// Whether the caller may resubmit the same command with the same key.
    ///
    /// Only storage failures qualify: the atomic unit was rolled back, so a
    /// retry either commits for the first time or replays a concurrent commit.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StorageFailure(_))
    }
}

impl From<MoneyError> for LedgerError {
    fn from(_: MoneyError) -> Self {
        LedgerError::InvalidValue
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::StorageFailure(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::StorageFailure(format!("payload encoding: {}", e))
    }
}
