use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::domain::{Account, Clock};
use crate::storage::{AccountRegistry, TransactionLog};

use super::LedgerError;

/// Outcome of one pass of the end-of-day recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    /// The day folded into the snapshots ("yesterday" when the job ran)
    pub as_of: NaiveDate,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl RecalculationReport {
    fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            updated: 0,
            unchanged: 0,
            failed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoldOutcome {
    Updated,
    Unchanged,
}

/// Folds each account's movements up to yesterday into its EOD snapshot.
///
/// Accounts are processed independently on at most `workers` concurrent
/// tasks. A failing account is logged and counted; it never stops the rest.
pub struct RecalculationJob {
    registry: Arc<AccountRegistry>,
    log: Arc<TransactionLog>,
    clock: Arc<dyn Clock>,
    workers: usize,
}

impl RecalculationJob {
    pub fn new(
        registry: Arc<AccountRegistry>,
        log: Arc<TransactionLog>,
        clock: Arc<dyn Clock>,
        workers: usize,
    ) -> Self {
        Self {
            registry,
            log,
            clock,
            workers: workers.max(1),
        }
    }

    /// Run one pass. Running it again on the same day changes nothing.
    pub async fn run(&self) -> RecalculationReport {
        let today = self.clock.today();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        let mut report = RecalculationReport::new(yesterday);

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for account in self.registry.all_accounts() {
            // Semaphore is never closed
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                error!(account_id = account.id(), "recalculation pool unavailable");
                report.failed += 1;
                continue;
            };
            let log = Arc::clone(&self.log);
            // The account lock is a blocking mutex; keep its wait off the async workers
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = recalculate_account(&account, &log, yesterday);
                (account, result)
            });
        }

        collect_outcomes(tasks, &mut report).await;

        info!(
            as_of = %report.as_of,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            "balance recalculation finished"
        );
        report
    }
}

type FoldTask = (Arc<Account>, Result<FoldOutcome, LedgerError>);

/// Drain the per-account tasks into `report`. Failed folds and panicked tasks
/// are logged and counted; they never stop the remaining accounts.
async fn collect_outcomes(mut tasks: JoinSet<FoldTask>, report: &mut RecalculationReport) {
    let yesterday = report.as_of;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(FoldOutcome::Updated))) => report.updated += 1,
            Ok((_, Ok(FoldOutcome::Unchanged))) => report.unchanged += 1,
            Ok((account, Err(err))) => {
                error!(
                    account_id = account.id(),
                    yesterday = %yesterday,
                    error = %err,
                    "can't update EOD balance"
                );
                report.failed += 1;
            }
            Err(join_err) => {
                error!(yesterday = %yesterday, error = %join_err, "recalculation task failed");
                report.failed += 1;
            }
        }
    }
}

fn recalculate_account(
    account: &Account,
    log: &TransactionLog,
    yesterday: NaiveDate,
) -> Result<FoldOutcome, LedgerError> {
    let guard = account.lock();
    let snapshot = guard.snapshot();

    // Already up to date, or the clock moved backward
    if yesterday <= snapshot.balance_last_update_date {
        return Ok(FoldOutcome::Unchanged);
    }

    let delta = log.sum_amounts_for_date_range(
        account.id(),
        snapshot.balance_last_update_date,
        yesterday,
        false,
        true,
    )?;
    let folded = guard.fold(delta, yesterday);
    debug!(
        account_id = account.id(),
        delta = %delta,
        eod_balance = %folded.eod_balance,
        balance_last_update_date = %folded.balance_last_update_date,
        "EOD balance updated"
    );
    Ok(FoldOutcome::Updated)
}
