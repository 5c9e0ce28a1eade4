use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::domain::{Account, Clock};

use super::StorageError;

/// In-memory registry of every account, keyed by id.
///
/// Lookups take no account lock. Accounts are never removed.
pub struct AccountRegistry {
    accounts: DashMap<String, Arc<Account>>,
    clock: Arc<dyn Clock>,
}

impl AccountRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: DashMap::new(),
            clock,
        }
    }

    /// Create an account with a zero balance as of the end of yesterday.
    ///
    /// The check-and-insert is atomic: of several concurrent creators of the
    /// same id exactly one succeeds.
    pub fn create_account(
        &self,
        id: &str,
        negative_balance_allowed: bool,
    ) -> Result<Arc<Account>, StorageError> {
        let today = self.clock.today();
        let as_of = today.pred_opt().unwrap_or(today);

        match self.accounts.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateAccount(id.to_string())),
            Entry::Vacant(slot) => {
                let account = Arc::new(Account::new(id, negative_balance_allowed, as_of));
                slot.insert(Arc::clone(&account));
                debug!(
                    account_id = id,
                    negative_balance_allowed,
                    balance_last_update_date = %as_of,
                    "account created"
                );
                Ok(account)
            }
        }
    }

    pub fn find_account_by_id(&self, id: &str) -> Option<Arc<Account>> {
        let result = self.accounts.get(id).map(|account| Arc::clone(account.value()));
        if result.is_none() {
            debug!(account_id = id, "no account found");
        }
        result
    }

    /// Snapshot of all accounts. Accounts created while this runs may or may
    /// not be included.
    pub fn all_accounts(&self) -> Vec<Arc<Account>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
