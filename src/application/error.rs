use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Amount, TransferRejection};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(TransferRejection),

    #[error("Insufficient funds in account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_id: String,
        balance: Amount,
        required: Amount,
    },

    #[error("Invalid date range: {from} must be earlier than {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification for whichever layer turns errors into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller sent something the ledger refuses (client error)
    Validation,
    /// The referenced account does not exist
    NotFound,
    /// Anything else
    Internal,
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::DuplicateAccount(_)
            | LedgerError::InvalidTransfer(_)
            | LedgerError::InsufficientFunds { .. } => ErrorCategory::Validation,
            LedgerError::AccountNotFound(_) => ErrorCategory::NotFound,
            LedgerError::InvalidRange { .. } | LedgerError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateAccount(id) => LedgerError::DuplicateAccount(id),
            StorageError::InvalidRange { from, to } => LedgerError::InvalidRange { from, to },
        }
    }
}

impl From<TransferRejection> for LedgerError {
    fn from(rejection: TransferRejection) -> Self {
        LedgerError::InvalidTransfer(rejection)
    }
}
