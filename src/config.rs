//! Runtime settings for the ledger engine.

use anyhow::{Result, ensure};

/// Default size of the recalculation worker pool.
pub const DEFAULT_RECALCULATION_WORKERS: usize = 10;

/// Tunable parameters for a [`LedgerService`](crate::application::LedgerService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum number of accounts recalculated concurrently.
    pub recalculation_workers: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            recalculation_workers: DEFAULT_RECALCULATION_WORKERS,
        }
    }
}

impl LedgerConfig {
    pub fn with_recalculation_workers(mut self, workers: usize) -> Self {
        self.recalculation_workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.recalculation_workers >= 1,
            "recalculation_workers must be at least 1 (got {})",
            self.recalculation_workers
        );
        Ok(())
    }
}
