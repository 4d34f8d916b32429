// Platform error model shared by every service.
// Errors carry a stable machine-readable code, a category and a retryable flag.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Broad classification used to decide retry and surface behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Blockchain,
    Integration,
}

/// Closed set of error codes a caller can render a specific message for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidTokenMint,
    InvalidWalletAddress,
    InsufficientBalance,
    InvalidAmount,
    InvalidParameters,
    IcoNotActive,
    IcoSoldOut,
    IcoNotFound,
    UnauthorizedAccess,
    AirdropNotFound,
    AirdropAlreadyExecuted,
    InvalidRecipients,
    PoolNotFound,
    InsufficientLiquidity,
    SlippageExceeded,
    TransactionFailed,
    NetworkError,
    WalletNotConnected,
    MaxRetriesExceeded,
    FeeEstimationFailed,
    TransactionConfirmationFailed,
    StorageUploadFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidTokenMint => "INVALID_TOKEN_MINT",
            ErrorCode::InvalidWalletAddress => "INVALID_WALLET_ADDRESS",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::InvalidParameters => "INVALID_PARAMETERS",
            ErrorCode::IcoNotActive => "ICO_NOT_ACTIVE",
            ErrorCode::IcoSoldOut => "ICO_SOLD_OUT",
            ErrorCode::IcoNotFound => "ICO_NOT_FOUND",
            ErrorCode::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            ErrorCode::AirdropNotFound => "AIRDROP_NOT_FOUND",
            ErrorCode::AirdropAlreadyExecuted => "AIRDROP_ALREADY_EXECUTED",
            ErrorCode::InvalidRecipients => "INVALID_RECIPIENTS",
            ErrorCode::PoolNotFound => "POOL_NOT_FOUND",
            ErrorCode::InsufficientLiquidity => "INSUFFICIENT_LIQUIDITY",
            ErrorCode::SlippageExceeded => "SLIPPAGE_EXCEEDED",
            ErrorCode::TransactionFailed => "TRANSACTION_FAILED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::WalletNotConnected => "WALLET_NOT_CONNECTED",
            ErrorCode::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED",
            ErrorCode::FeeEstimationFailed => "FEE_ESTIMATION_FAILED",
            ErrorCode::TransactionConfirmationFailed => "TRANSACTION_CONFIRMATION_FAILED",
            ErrorCode::StorageUploadFailed => "STORAGE_UPLOAD_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct PlatformError {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    pub retryable: bool,
}

pub type Result<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    pub fn new(
        code: ErrorCode,
        category: ErrorCategory,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            code,
            category,
            message: message.into(),
            retryable,
        }
    }

    /// Bad input shape or range. Never retryable.
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, ErrorCategory::Validation, message, false)
    }

    pub fn blockchain(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self::new(code, ErrorCategory::Blockchain, message, retryable)
    }

    pub fn integration(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self::new(code, ErrorCategory::Integration, message, retryable)
    }

    pub fn invalid_wallet(address: &str) -> Self {
        Self::validation(
            ErrorCode::InvalidWalletAddress,
            format!("invalid wallet address: {address:?}"),
        )
    }

    pub fn invalid_mint(mint: &str) -> Self {
        Self::validation(ErrorCode::InvalidTokenMint, format!("invalid token mint: {mint:?}"))
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::InvalidAmount, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::InvalidParameters, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::UnauthorizedAccess, message)
    }

    pub fn insufficient_balance(wallet: &str, mint: &str, needed: f64, available: f64) -> Self {
        Self::validation(
            ErrorCode::InsufficientBalance,
            format!("wallet {wallet} holds {available} of {mint}, needs {needed}"),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::blockchain(ErrorCode::NetworkError, message, true)
    }

    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::blockchain(ErrorCode::TransactionFailed, message, false)
    }

    /// Returns true when the error belongs to the given category.
    pub fn is(&self, category: ErrorCategory) -> bool {
        self.category == category
    }
}

impl From<sqlx::Error> for PlatformError {
    fn from(err: sqlx::Error) -> Self {
        // Pool/IO failures are transient; query and decode errors are not.
        let retryable = matches!(
            err,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
        );
        Self::integration(ErrorCode::NetworkError, format!("database error: {err}"), retryable)
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::integration(
            ErrorCode::InvalidParameters,
            format!("serialization error: {err}"),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_string(&ErrorCode::IcoSoldOut).unwrap();
        assert_eq!(json, "\"ICO_SOLD_OUT\"");
        assert_eq!(ErrorCode::IcoSoldOut.as_str(), "ICO_SOLD_OUT");

        let parsed: ErrorCode = serde_json::from_str("\"UNAUTHORIZED_ACCESS\"").unwrap();
        assert_eq!(parsed, ErrorCode::UnauthorizedAccess);
    }

    #[test]
    fn test_validation_errors_are_not_retryable() {
        let err = PlatformError::invalid_amount("negative");
        assert!(!err.retryable);
        assert!(err.is(ErrorCategory::Validation));
        assert_eq!(err.to_string(), "INVALID_AMOUNT: negative");
    }

    #[test]
    fn test_network_errors_are_retryable() {
        let err = PlatformError::network("timeout");
        assert!(err.retryable);
        assert_eq!(err.category, ErrorCategory::Blockchain);
    }
}
