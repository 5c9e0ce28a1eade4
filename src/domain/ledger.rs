use std::collections::HashMap;

use super::{AccountId, Amount, EodSnapshot, LedgerEntry};

/// Current balance = EOD snapshot + every movement not yet folded into it.
pub fn compute_balance(snapshot: &EodSnapshot, unfolded: Amount) -> Amount {
    snapshot.eod_balance + unfolded
}

/// Net movement per account over a set of entries.
/// Returns a map of account_id -> sum of its legs
pub fn compute_all_balances<'a, I>(entries: I) -> HashMap<AccountId, Amount>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut balances: HashMap<AccountId, Amount> = HashMap::new();

    for entry in entries {
        *balances
            .entry(entry.account_id.clone())
            .or_insert(Amount::ZERO) += entry.amount;
    }

    balances
}

/// Validate that debiting `amount` leaves the balance non-negative.
pub fn validate_balance_reduction(balance: Amount, amount: Amount) -> Result<(), InsufficientFunds> {
    if balance - amount < Amount::ZERO {
        return Err(InsufficientFunds {
            balance,
            required: amount,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientFunds {
    pub balance: Amount,
    pub required: Amount,
}

impl std::fmt::Display for InsufficientFunds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "balance of {} is insufficient to transfer {}",
            self.balance, self.required
        )
    }
}

impl std::error::Error for InsufficientFunds {}
