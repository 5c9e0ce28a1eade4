use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount};

/// Monotonically increasing id shared by both legs of one transfer.
pub type TransactionId = u64;

/// One signed movement against one account. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    /// Negative for the debited account, positive for the credited one
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// Calendar date (UTC) the entry is indexed under.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Both legs of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub debit: LedgerEntry,
    pub credit: LedgerEntry,
}

impl Transaction {
    /// Build the two balancing legs of a transfer of `amount` from `from` to `to`.
    pub fn new(
        id: TransactionId,
        from: &str,
        to: &str,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            debit: LedgerEntry {
                transaction_id: id,
                account_id: from.to_string(),
                amount: -amount,
                timestamp,
            },
            credit: LedgerEntry {
                transaction_id: id,
                account_id: to.to_string(),
                amount,
                timestamp,
            },
        }
    }

    pub fn legs(&self) -> [&LedgerEntry; 2] {
        [&self.debit, &self.credit]
    }
}
