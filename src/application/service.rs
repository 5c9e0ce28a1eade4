use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::domain::{
    Account, AccountId, Amount, Clock, LedgerEntry, SystemClock, Transaction, TransactionId,
    compute_all_balances, compute_balance,
};
use crate::storage::{AccountRegistry, TransactionLog};

use super::{LedgerError, RecalculationJob, RecalculationReport, TransferEngine};

/// Application service providing the ledger's operations.
/// This is the primary interface for any client (CLI, importer, request layer).
pub struct LedgerService {
    registry: Arc<AccountRegistry>,
    log: Arc<TransactionLog>,
    clock: Arc<dyn Clock>,
    engine: TransferEngine,
    recalculation: RecalculationJob,
}

/// Displayable state of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub negative_balance_allowed: bool,
    pub eod_balance: Amount,
    pub current_balance: Amount,
    pub balance_last_update_date: NaiveDate,
}

impl LedgerService {
    /// Create an empty ledger driven by the given clock.
    pub fn new(clock: Arc<dyn Clock>, config: &LedgerConfig) -> Self {
        let registry = Arc::new(AccountRegistry::new(Arc::clone(&clock)));
        let log = Arc::new(TransactionLog::new());
        let engine = TransferEngine::new(
            Arc::clone(&registry),
            Arc::clone(&log),
            Arc::clone(&clock),
        );
        let recalculation = RecalculationJob::new(
            Arc::clone(&registry),
            Arc::clone(&log),
            Arc::clone(&clock),
            config.recalculation_workers,
        );

        Self {
            registry,
            log,
            clock,
            engine,
            recalculation,
        }
    }

    /// Create an empty ledger on wall-clock time.
    pub fn with_system_clock(config: &LedgerConfig) -> Self {
        Self::new(Arc::new(SystemClock), config)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account. Fails if the id is taken.
    pub fn create_account(
        &self,
        id: &str,
        negative_balance_allowed: bool,
    ) -> Result<Arc<Account>, LedgerError> {
        Ok(self.registry.create_account(id, negative_balance_allowed)?)
    }

    pub fn find_account_by_id(&self, id: &str) -> Option<Arc<Account>> {
        self.registry.find_account_by_id(id)
    }

    /// Like [`find_account_by_id`](Self::find_account_by_id), but a missing account is an error.
    pub fn get_account(&self, id: &str) -> Result<Arc<Account>, LedgerError> {
        self.find_account_by_id(id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    /// Current balance: EOD snapshot plus unfolded movements.
    pub fn current_balance(&self, id: &str) -> Result<Amount, LedgerError> {
        let account = self.get_account(id)?;
        Ok(self.engine.current_balance(&account))
    }

    pub fn account_summary(&self, id: &str) -> Result<AccountSummary, LedgerError> {
        let account = self.get_account(id)?;
        Ok(self.summarize(&account))
    }

    /// Summaries of every account, ordered by id.
    pub fn list_account_summaries(&self) -> Vec<AccountSummary> {
        let mut summaries: Vec<AccountSummary> = self
            .registry
            .all_accounts()
            .iter()
            .map(|account| self.summarize(account))
            .collect();
        summaries.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        summaries
    }

    pub fn account_count(&self) -> usize {
        self.registry.len()
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move money between two accounts.
    pub fn transfer_money(
        &self,
        from_id: &str,
        to_id: &str,
        amount: Amount,
    ) -> Result<TransactionId, LedgerError> {
        self.engine.transfer_money(from_id, to_id, amount)
    }

    pub fn find_transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.log.find_transaction(id)
    }

    /// Every leg recorded against an account, oldest first.
    pub fn entries_for_account(&self, id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let account = self.get_account(id)?;
        Ok(self.log.entries_for_account(account.id()))
    }

    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.log.all_transactions()
    }

    pub fn last_transaction_id(&self) -> TransactionId {
        self.log.last_transaction_id()
    }

    /// Sum of every leg ever recorded. Zero whenever no transfer is mid-commit.
    pub fn total_ledger_amount(&self) -> Amount {
        self.log.total_amount()
    }

    /// Net movement per account, recomputed from every logged leg.
    pub fn net_movements(&self) -> HashMap<AccountId, Amount> {
        let transactions = self.log.all_transactions();
        compute_all_balances(transactions.iter().flat_map(|tx| tx.legs()))
    }

    /// Check the log against the accounts: legs sum to zero, and every
    /// account's current balance equals its net movement (accounts open at zero).
    ///
    /// Only meaningful while no transfer is mid-commit.
    pub fn reconcile(&self) -> Result<(), LedgerError> {
        let movements = self.net_movements();

        let total: Amount = movements.values().copied().sum();
        if total != Amount::ZERO {
            return Err(anyhow::anyhow!("ledger does not balance: entries sum to {}", total).into());
        }

        for summary in self.list_account_summaries() {
            let expected = movements
                .get(&summary.account_id)
                .copied()
                .unwrap_or(Amount::ZERO);
            if summary.current_balance != expected {
                return Err(anyhow::anyhow!(
                    "account {} reports {} but its entries sum to {}",
                    summary.account_id,
                    summary.current_balance,
                    expected
                )
                .into());
            }
        }
        Ok(())
    }

    // ========================
    // End-of-day maintenance
    // ========================

    /// Fold movements up to yesterday into every account's EOD snapshot.
    pub async fn recalculate_balances(&self) -> RecalculationReport {
        self.recalculation.run().await
    }

    // Both balances come from one snapshot read so they always agree.
    fn summarize(&self, account: &Account) -> AccountSummary {
        let snapshot = account.snapshot();
        AccountSummary {
            account_id: account.id().to_string(),
            negative_balance_allowed: account.negative_balance_allowed(),
            eod_balance: snapshot.eod_balance,
            current_balance: compute_balance(
                &snapshot,
                self.log
                    .sum_amounts_since(account.id(), snapshot.first_unfolded_date()),
            ),
            balance_last_update_date: snapshot.balance_last_update_date,
        }
    }
}
