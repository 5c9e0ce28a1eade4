use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    Account, Amount, Clock, TransactionId, TransferRequest, compute_balance,
    validate_balance_reduction,
};
use crate::storage::{AccountRegistry, TransactionLog};

use super::LedgerError;

/// Validates and commits transfers.
///
/// Only the source account is locked. A credit can never push a balance below
/// zero, so the destination leg is appended without taking its lock, and no
/// operation ever holds two account locks at once.
pub struct TransferEngine {
    registry: Arc<AccountRegistry>,
    log: Arc<TransactionLog>,
    clock: Arc<dyn Clock>,
}

impl TransferEngine {
    pub fn new(
        registry: Arc<AccountRegistry>,
        log: Arc<TransactionLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            log,
            clock,
        }
    }

    /// Move `amount` from `from_id` to `to_id`, returning the new transaction id.
    ///
    /// Checks, in order: distinct accounts, positive amount, both accounts
    /// exist, sufficient funds. The funds check runs once optimistically and
    /// again under the source account's lock, since a concurrent debit may
    /// have drained the account in between.
    pub fn transfer_money(
        &self,
        from_id: &str,
        to_id: &str,
        amount: Amount,
    ) -> Result<TransactionId, LedgerError> {
        TransferRequest::new(from_id, to_id, amount).validate()?;

        let account_from = self
            .registry
            .find_account_by_id(from_id)
            .ok_or_else(|| LedgerError::AccountNotFound(from_id.to_string()))?;
        let account_to = self
            .registry
            .find_account_by_id(to_id)
            .ok_or_else(|| LedgerError::AccountNotFound(to_id.to_string()))?;

        self.validate_debit(&account_from, amount)?;

        let _guard = account_from.lock();
        self.validate_debit(&account_from, amount)?;

        let now = self.clock.now();
        let transaction_id = self
            .log
            .append(account_from.id(), account_to.id(), amount, now);
        debug!(
            transaction_id,
            from = from_id,
            to = to_id,
            amount = %amount,
            "transfer committed"
        );
        Ok(transaction_id)
    }

    /// EOD snapshot plus everything logged since the watermark.
    pub fn current_balance(&self, account: &Account) -> Amount {
        let snapshot = account.snapshot();
        let unfolded = self
            .log
            .sum_amounts_since(account.id(), snapshot.first_unfolded_date());
        compute_balance(&snapshot, unfolded)
    }

    fn validate_debit(&self, account: &Account, amount: Amount) -> Result<(), LedgerError> {
        if account.negative_balance_allowed() {
            debug!(account_id = account.id(), "negative balance allowed, skipping funds check");
            return Ok(());
        }

        let balance = self.current_balance(account);
        validate_balance_reduction(balance, amount).map_err(|shortfall| {
            debug!(
                account_id = account.id(),
                balance = %shortfall.balance,
                required = %shortfall.required,
                "insufficient funds"
            );
            LedgerError::InsufficientFunds {
                account_id: account.id().to_string(),
                balance: shortfall.balance,
                required: shortfall.required,
            }
        })?;

        debug!(account_id = account.id(), balance = %balance, amount = %amount, "funds available");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{SettableClock, TransferRejection};

    struct Fixture {
        registry: Arc<AccountRegistry>,
        log: Arc<TransactionLog>,
        engine: TransferEngine,
    }

    fn fixture() -> Fixture {
        let clock: Arc<dyn Clock> =
            Arc::new(SettableClock::at_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let registry = Arc::new(AccountRegistry::new(Arc::clone(&clock)));
        let log = Arc::new(TransactionLog::new());
        let engine = TransferEngine::new(Arc::clone(&registry), Arc::clone(&log), clock);
        Fixture {
            registry,
            log,
            engine,
        }
    }

    #[test]
    fn test_transfer_moves_money() -> anyhow::Result<()> {
        let f = fixture();
        let bank = f.registry.create_account("bank", true)?;
        let alice = f.registry.create_account("alice", false)?;

        let id = f.engine.transfer_money("bank", "alice", Amount::from(10))?;

        assert_eq!(id, 1);
        assert_eq!(f.engine.current_balance(&bank), Amount::from(-10));
        assert_eq!(f.engine.current_balance(&alice), Amount::from(10));
        assert_eq!(f.log.total_amount(), Amount::ZERO);
        Ok(())
    }

    #[test]
    fn test_self_transfer_rejected_first() {
        let f = fixture();
        let result = f.engine.transfer_money("ghost", "ghost", Amount::from(10));
        assert!(matches!(
            result,
            Err(LedgerError::InvalidTransfer(TransferRejection::SelfTransfer))
        ));
    }

    #[test]
    fn test_non_positive_amount_rejected_before_lookup() {
        let f = fixture();
        let result = f.engine.transfer_money("ghost", "phantom", Amount::ZERO);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidTransfer(TransferRejection::NonPositiveAmount(_)))
        ));
    }

    #[test]
    fn test_missing_accounts() -> anyhow::Result<()> {
        let f = fixture();
        f.registry.create_account("alice", false)?;

        let missing_source = f.engine.transfer_money("ghost", "alice", Amount::ONE);
        assert!(matches!(missing_source, Err(LedgerError::AccountNotFound(id)) if id == "ghost"));

        let missing_destination = f.engine.transfer_money("alice", "ghost", Amount::ONE);
        assert!(matches!(missing_destination, Err(LedgerError::AccountNotFound(id)) if id == "ghost"));
        assert_eq!(f.log.transaction_count(), 0);
        Ok(())
    }

    #[test]
    fn test_insufficient_funds() -> anyhow::Result<()> {
        let f = fixture();
        f.registry.create_account("bank", true)?;
        f.registry.create_account("alice", false)?;
        f.registry.create_account("bob", false)?;
        f.engine.transfer_money("bank", "alice", Amount::from(5))?;

        let result = f.engine.transfer_money("alice", "bob", Amount::new(501, 2));

        match result {
            Err(LedgerError::InsufficientFunds {
                account_id,
                balance,
                required,
            }) => {
                assert_eq!(account_id, "alice");
                assert_eq!(balance, Amount::from(5));
                assert_eq!(required, Amount::new(501, 2));
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }

        // Draining the account exactly to zero is fine
        f.engine.transfer_money("alice", "bob", Amount::from(5))?;
        Ok(())
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() -> anyhow::Result<()> {
        let f = fixture();
        f.registry.create_account("bank", true)?;
        let source = f.registry.create_account("source", false)?;
        f.engine.transfer_money("bank", "source", Amount::from(50))?;
        for i in 0..60 {
            f.registry.create_account(&format!("dest-{}", i), false)?;
        }

        let successes: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..60)
                .map(|i| {
                    let engine = &f.engine;
                    s.spawn(move || {
                        engine
                            .transfer_money("source", &format!("dest-{}", i), Amount::ONE)
                            .is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(successes, 50);
        assert_eq!(f.engine.current_balance(&source), Amount::ZERO);
        Ok(())
    }
}
