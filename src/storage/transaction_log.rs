use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{Amount, LedgerEntry, Transaction, TransactionId};

use super::StorageError;

/// Entries of one account, bucketed by calendar day. Within a day entries keep
/// their insertion order.
type DayIndex = BTreeMap<NaiveDate, Vec<LedgerEntry>>;

/// Append-only store of ledger entries.
///
/// Entries are indexed by transaction id and, per account, by date so that
/// "balance since" and "delta over a date range" are single range folds.
/// Each account's day index has its own lock; there is no global lock on the
/// append path.
pub struct TransactionLog {
    sequence: AtomicU64,
    by_id: DashMap<TransactionId, Transaction>,
    by_account: DashMap<String, Arc<RwLock<DayIndex>>>,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// A log whose first transaction id will be `last_id + 1`.
    pub fn starting_after(last_id: TransactionId) -> Self {
        Self {
            sequence: AtomicU64::new(last_id),
            by_id: DashMap::new(),
            by_account: DashMap::new(),
        }
    }

    /// Record a transfer as two balancing legs timestamped `now`.
    ///
    /// Allocates a fresh, strictly increasing transaction id. Concurrent appends
    /// touching the same account and day accumulate; nothing is overwritten.
    pub fn append(
        &self,
        account_from: &str,
        account_to: &str,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> TransactionId {
        let transaction_id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let transaction = Transaction::new(transaction_id, account_from, account_to, amount, now);

        for leg in transaction.legs() {
            let index = self.day_index(&leg.account_id);
            index
                .write()
                .entry(leg.date())
                .or_default()
                .push(leg.clone());
        }

        debug!(
            transaction_id,
            account_from,
            account_to,
            amount = %amount,
            timestamp = %now,
            "transaction legs recorded"
        );
        self.by_id.insert(transaction_id, transaction);
        transaction_id
    }

    /// Sum of all legs for the account dated on or after `from_date`.
    pub fn sum_amounts_since(&self, account_id: &str, from_date: NaiveDate) -> Amount {
        let result = self.fold_range(account_id, (Bound::Included(from_date), Bound::Unbounded));
        debug!(account_id, from_date = %from_date, sum = %result, "summed amounts since");
        result
    }

    /// Sum of all legs for the account within the date range.
    ///
    /// Fails with [`StorageError::InvalidRange`] unless `from_date` is strictly
    /// before `to_date`.
    pub fn sum_amounts_for_date_range(
        &self,
        account_id: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        from_inclusive: bool,
        to_inclusive: bool,
    ) -> Result<Amount, StorageError> {
        if from_date >= to_date {
            return Err(StorageError::InvalidRange {
                from: from_date,
                to: to_date,
            });
        }

        let lower = if from_inclusive {
            Bound::Included(from_date)
        } else {
            Bound::Excluded(from_date)
        };
        let upper = if to_inclusive {
            Bound::Included(to_date)
        } else {
            Bound::Excluded(to_date)
        };

        let result = self.fold_range(account_id, (lower, upper));
        debug!(
            account_id,
            from_date = %from_date,
            from_inclusive,
            to_date = %to_date,
            to_inclusive,
            sum = %result,
            "summed amounts for date range"
        );
        Ok(result)
    }

    /// Both legs of a transaction.
    pub fn find_transaction(&self, transaction_id: TransactionId) -> Option<Transaction> {
        self.by_id.get(&transaction_id).map(|tx| tx.value().clone())
    }

    /// Every leg recorded against the account, ordered by day then by commit.
    pub fn entries_for_account(&self, account_id: &str) -> Vec<LedgerEntry> {
        match self.existing_day_index(account_id) {
            Some(index) => index.read().values().flatten().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Every transaction, ordered by id.
    pub fn all_transactions(&self) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> =
            self.by_id.iter().map(|tx| tx.value().clone()).collect();
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    /// Sum over every leg in the log; zero whenever no append is in flight.
    pub fn total_amount(&self) -> Amount {
        self.by_id
            .iter()
            .flat_map(|tx| [tx.debit.amount, tx.credit.amount])
            .sum()
    }

    /// The id handed to the most recent append, or 0 if none happened.
    pub fn last_transaction_id(&self) -> TransactionId {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn transaction_count(&self) -> usize {
        self.by_id.len()
    }

    fn fold_range(&self, account_id: &str, range: (Bound<NaiveDate>, Bound<NaiveDate>)) -> Amount {
        match self.existing_day_index(account_id) {
            Some(index) => index
                .read()
                .range(range)
                .flat_map(|(_, entries)| entries.iter())
                .map(|entry| entry.amount)
                .sum(),
            None => Amount::ZERO,
        }
    }

    // Clone the Arc out so no map shard stays locked while the index lock is held.
    fn day_index(&self, account_id: &str) -> Arc<RwLock<DayIndex>> {
        if let Some(index) = self.existing_day_index(account_id) {
            return index;
        }
        Arc::clone(
            self.by_account
                .entry(account_id.to_string())
                .or_default()
                .value(),
        )
    }

    fn existing_day_index(&self, account_id: &str) -> Option<Arc<RwLock<DayIndex>>> {
        self.by_account
            .get(account_id)
            .map(|index| Arc::clone(index.value()))
    }
}
