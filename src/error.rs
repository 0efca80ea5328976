use axum::http::StatusCode;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::db::payment::PaymentStatus;

pub type Result<T> = std::result::Result<T, BankingError>;

/// Everything the service can report back to a caller. Validation and
/// not-found errors are raised before any write; `TransactionIntegrity`
/// means a write inside the payment commit affected an unexpected number
/// of rows and the whole transaction was rolled back.
#[derive(Debug, Error)]
pub enum BankingError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("beneficiary not found: {0}")]
    BeneficiaryNotFound(Uuid),

    #[error("payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    #[error("payments in {0} are blocked")]
    PaymentBlocked(String),

    #[error("only scheduled payments can be cancelled, current status is {0}")]
    InvalidStateTransition(PaymentStatus),

    #[error("beneficiary {0} is referenced by recorded payments")]
    BeneficiaryInUse(Uuid),

    #[error("write affected {affected} rows, expected 1")]
    TransactionIntegrity { affected: u64 },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl BankingError {
    /// Machine-readable error kind, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            BankingError::Validation { .. } => "VALIDATION_ERROR",
            BankingError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BankingError::BeneficiaryNotFound(_) => "BENEFICIARY_NOT_FOUND",
            BankingError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            BankingError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BankingError::PaymentBlocked(_) => "PAYMENT_BLOCKED",
            BankingError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            BankingError::BeneficiaryInUse(_) => "BENEFICIARY_IN_USE",
            BankingError::TransactionIntegrity { .. } => "TRANSACTION_INTEGRITY_ERROR",
            BankingError::UnknownTool(_) => "UNKNOWN_TOOL",
            BankingError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BankingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BankingError::AccountNotFound(_)
            | BankingError::BeneficiaryNotFound(_)
            | BankingError::PaymentNotFound(_)
            | BankingError::UnknownTool(_) => StatusCode::NOT_FOUND,
            BankingError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BankingError::PaymentBlocked(_) => StatusCode::FORBIDDEN,
            BankingError::InvalidStateTransition(_) | BankingError::BeneficiaryInUse(_) => {
                StatusCode::CONFLICT
            }
            BankingError::TransactionIntegrity { .. } | BankingError::StoreUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
