use std::io::Read;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::application::{LedgerError, LedgerService, RecalculationReport};
use crate::domain::{Clock, SettableClock, parse_amount};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
    /// Nightly recalculations triggered while replaying
    pub recalculations: Vec<RecalculationReport>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Count duplicate accounts as skipped instead of as errors
    pub skip_duplicates: bool,
    /// Run the EOD recalculation each time the replay crosses midnight
    pub recalculate_daily: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_duplicates: false,
            recalculate_daily: true,
        }
    }
}

/// Loads accounts and replays transfers into a ledger.
///
/// The ledger must be driven by `clock`: the replay moves it to each
/// transfer's timestamp so legs are dated as recorded, and stands in for the
/// nightly trigger when a row falls on a later day than the one before.
pub struct Importer<'a> {
    service: &'a LedgerService,
    clock: Arc<SettableClock>,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService, clock: Arc<SettableClock>) -> Self {
        Self { service, clock }
    }

    /// Import accounts from CSV: `id,negative_balance_allowed`
    pub fn import_accounts_csv<R: Read>(
        &self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let id = record.get(0).unwrap_or("").trim();
            if id.is_empty() {
                result.errors.push(ImportError {
                    line,
                    field: Some("id".to_string()),
                    error: "Account id is empty".to_string(),
                });
                continue;
            }

            let negative_balance_allowed = match parse_flag(record.get(1).unwrap_or("")) {
                Some(flag) => flag,
                None => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("negative_balance_allowed".to_string()),
                        error: format!("Invalid flag: {}", record.get(1).unwrap_or("")),
                    });
                    continue;
                }
            };

            match self.service.create_account(id, negative_balance_allowed) {
                Ok(_) => result.imported += 1,
                Err(LedgerError::DuplicateAccount(_)) if options.skip_duplicates => {
                    result.skipped += 1;
                }
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: Some("id".to_string()),
                    error: e.to_string(),
                }),
            }
        }

        debug!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "accounts imported"
        );
        Ok(result)
    }

    /// Replay transfers from CSV, oldest first: `timestamp,from,to,amount`
    ///
    /// Rejected transfers (insufficient funds, unknown account, ...) are
    /// recorded as row errors and the replay carries on.
    pub async fn replay_transfers_csv<R: Read>(
        &self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2;

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let timestamp_str = record.get(0).unwrap_or("");
            let from = record.get(1).unwrap_or("").trim();
            let to = record.get(2).unwrap_or("").trim();
            let amount_str = record.get(3).unwrap_or("");

            let timestamp = match parse_timestamp(timestamp_str) {
                Ok(ts) => ts,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("timestamp".to_string()),
                        error: format!("Invalid timestamp: {}", e),
                    });
                    continue;
                }
            };

            let amount = match parse_amount(amount_str) {
                Ok(a) => a,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("amount".to_string()),
                        error: format!("Invalid amount: {}", e),
                    });
                    continue;
                }
            };

            if timestamp < self.clock.now() {
                result.errors.push(ImportError {
                    line,
                    field: Some("timestamp".to_string()),
                    error: format!(
                        "Out of order: {} is earlier than the previous transfer",
                        timestamp.to_rfc3339()
                    ),
                });
                continue;
            }

            self.move_clock_to(timestamp, options, &mut result).await;

            match self.service.transfer_money(from, to, amount) {
                Ok(transaction_id) => {
                    debug!(line, transaction_id, "transfer replayed");
                    result.imported += 1;
                }
                Err(e) => {
                    warn!(line, from, to, amount = %amount, error = %e, "transfer rejected");
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("Transfer rejected: {}", e),
                    });
                }
            }
        }

        Ok(result)
    }

    /// Move the clock to midnight of `date` (if that is later) and run the
    /// nightly recalculation for it.
    pub async fn finish_at(&self, date: NaiveDate) -> RecalculationReport {
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        if midnight > self.clock.now() {
            self.clock.set(midnight);
        }
        self.service.recalculate_balances().await
    }

    async fn move_clock_to(
        &self,
        timestamp: DateTime<Utc>,
        options: &ImportOptions,
        result: &mut ImportResult,
    ) {
        let crossed_midnight = timestamp.date_naive() > self.clock.today();
        self.clock.set(timestamp);
        if crossed_midnight && options.recalculate_daily {
            let report = self.service.recalculate_balances().await;
            result.recalculations.push(report);
        }
    }
}

/// Earliest valid timestamp in a transfers CSV, used to start a replay clock.
/// Rows that don't parse are ignored here; the replay reports them.
pub fn earliest_transfer_timestamp<R: Read>(reader: R) -> Option<DateTime<Utc>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .records()
        .filter_map(|record| record.ok())
        .filter_map(|record| parse_timestamp(record.get(0).unwrap_or("")).ok())
        .min()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "" | "false" | "no" | "0" => Some(false),
        "true" | "yes" | "1" => Some(true),
        _ => None,
    }
}

// Helper function to parse timestamp
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try YYYY-MM-DD format
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    anyhow::bail!("Invalid timestamp format: {}", s)
}
