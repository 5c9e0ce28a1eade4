use chrono::NaiveDate;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};

use super::Amount;

pub type AccountId = String;

/// End-of-day snapshot: the account balance as of the end of `balance_last_update_date`.
///
/// Both fields are always read and written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EodSnapshot {
    pub eod_balance: Amount,
    /// Watermark: every entry dated on or before this day is folded into `eod_balance`.
    pub balance_last_update_date: NaiveDate,
}

impl EodSnapshot {
    /// First day whose entries are not yet part of `eod_balance`.
    pub fn first_unfolded_date(&self) -> NaiveDate {
        self.balance_last_update_date
            .succ_opt()
            .unwrap_or(self.balance_last_update_date)
    }
}

/// An account in the ledger.
///
/// Identity and the negative-balance policy never change. The EOD snapshot is
/// mutated in place by the recalculation job only, while the account's
/// advisory lock is held.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    negative_balance_allowed: bool,
    snapshot: RwLock<EodSnapshot>,
    lock: Mutex<()>,
}

impl Account {
    /// A fresh account with a zero balance as of the end of `as_of`.
    pub fn new(id: impl Into<AccountId>, negative_balance_allowed: bool, as_of: NaiveDate) -> Self {
        Self {
            id: id.into(),
            negative_balance_allowed,
            snapshot: RwLock::new(EodSnapshot {
                eod_balance: Amount::ZERO,
                balance_last_update_date: as_of,
            }),
            lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn negative_balance_allowed(&self) -> bool {
        self.negative_balance_allowed
    }

    /// Consistent copy of the EOD fields. Without the account lock held this is
    /// only eventually consistent with concurrent recalculation.
    pub fn snapshot(&self) -> EodSnapshot {
        *self.snapshot.read()
    }

    pub fn eod_balance(&self) -> Amount {
        self.snapshot.read().eod_balance
    }

    pub fn balance_last_update_date(&self) -> NaiveDate {
        self.snapshot.read().balance_last_update_date
    }

    /// Acquire the account's exclusive lock. Every balance-affecting
    /// read-then-write on this account happens under this guard.
    pub fn lock(&self) -> AccountGuard<'_> {
        AccountGuard {
            account: self,
            _guard: self.lock.lock(),
        }
    }
}

/// Proof that the account lock is held; the only way to move the EOD snapshot.
pub struct AccountGuard<'a> {
    account: &'a Account,
    _guard: MutexGuard<'a, ()>,
}

impl AccountGuard<'_> {
    pub fn account(&self) -> &Account {
        self.account
    }

    pub fn snapshot(&self) -> EodSnapshot {
        self.account.snapshot()
    }

    /// Fold `delta` into the EOD balance and move the watermark to `as_of`.
    /// The watermark never moves backward.
    pub fn fold(&self, delta: Amount, as_of: NaiveDate) -> EodSnapshot {
        let mut snapshot = self.account.snapshot.write();
        if as_of > snapshot.balance_last_update_date {
            snapshot.eod_balance += delta;
            snapshot.balance_last_update_date = as_of;
        }
        *snapshot
    }
}
