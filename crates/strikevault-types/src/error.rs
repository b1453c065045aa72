//! Error types for the StrikeVault settlement ledger.
//!
//! All errors use the `SV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Series state errors
//! - 2xx: Balance and collateral errors
//! - 3xx: Arithmetic errors
//! - 4xx: Invariant errors
//! - 9xx: General / configuration errors

use thiserror::Error;

use crate::{Address, Amount, SeriesState};

/// Central error enum for all StrikeVault operations.
#[derive(Debug, Error)]
pub enum StrikevaultError {
    // =================================================================
    // Series State Errors (1xx)
    // =================================================================
    /// The operation is not permitted in the series' current state
    /// (mint after expiry, withdraw before expiry, ...).
    #[error("SV_ERR_100: {operation} not permitted while series is {state}")]
    PreconditionFailed {
        operation: &'static str,
        state: SeriesState,
    },

    /// `force_expiration` was called on a series that has already expired.
    #[error("SV_ERR_101: Series already expired")]
    AlreadyExpired,

    /// The caller may not force expiration before the configured instant.
    #[error("SV_ERR_102: {caller} is not authorized to force expiration")]
    ExpirationDenied { caller: Address },

    /// Option amounts must be strictly positive.
    #[error("SV_ERR_103: Amount must be greater than zero")]
    InvalidAmount,

    // =================================================================
    // Balance / Collateral Errors (2xx)
    // =================================================================
    /// The holder does not own enough units to perform the operation.
    #[error("SV_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// The spender's allowance does not cover the requested pull.
    #[error("SV_ERR_201: Insufficient allowance: need {needed}, approved {available}")]
    InsufficientAllowance { needed: Amount, available: Amount },

    /// A burn asked to unlock more than the caller personally locked.
    #[error("SV_ERR_202: Insufficient locked collateral: need {needed}, locked {locked}")]
    InsufficientLocked { needed: Amount, locked: Amount },

    /// The vault's pool cannot cover the requested payout.
    #[error("SV_ERR_203: Insufficient liquidity: need {needed}, pool holds {available}")]
    InsufficientLiquidity { needed: Amount, available: Amount },

    // =================================================================
    // Arithmetic Errors (3xx)
    // =================================================================
    /// A fixed-point computation overflowed `u128`.
    #[error("SV_ERR_300: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Invariant Errors (4xx)
    // =================================================================
    /// A bookkeeping invariant does not hold. Critical.
    #[error("SV_ERR_400: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    // =================================================================
    // General / Configuration (9xx)
    // =================================================================
    /// The series definition is invalid.
    #[error("SV_ERR_900: Invalid series: {reason}")]
    InvalidSeries { reason: String },

    /// Configuration error (invalid config file, malformed amount, etc.).
    #[error("SV_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("SV_ERR_902: Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("SV_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, StrikevaultError>;

impl From<std::io::Error> for StrikevaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StrikevaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
