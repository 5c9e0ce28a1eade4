use serde::{Deserialize, Serialize};

use super::{AccountId, Amount};

/// A request to move `amount` from one account to another.
/// Transfers are never stored as such; the ledger keeps their two legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn new(from: impl Into<AccountId>, to: impl Into<AccountId>, amount: Amount) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// Shape checks that need no ledger state, in the order they are reported.
    pub fn validate(&self) -> Result<(), TransferRejection> {
        if self.from == self.to {
            return Err(TransferRejection::SelfTransfer);
        }
        if self.amount <= Amount::ZERO {
            return Err(TransferRejection::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

/// Why a transfer request is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRejection {
    SelfTransfer,
    NonPositiveAmount(Amount),
}

impl std::fmt::Display for TransferRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferRejection::SelfTransfer => {
                write!(f, "cannot transfer money between an account and itself")
            }
            TransferRejection::NonPositiveAmount(amount) => {
                write!(f, "cannot transfer a non-positive amount ({})", amount)
            }
        }
    }
}

impl std::error::Error for TransferRejection {}
