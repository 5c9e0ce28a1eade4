use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{AccountSummary, LedgerService};
use crate::domain::{TransactionId, format_amount};

/// Point-in-time view of the whole ledger for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub last_transaction_id: TransactionId,
    pub accounts: Vec<AccountSummary>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export account balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let summaries = self.service.list_account_summaries();
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "account",
            "negative_balance_allowed",
            "eod_balance",
            "current_balance",
            "balance_last_update_date",
        ])?;

        for summary in &summaries {
            csv_writer.write_record([
                summary.account_id.clone(),
                summary.negative_balance_allowed.to_string(),
                format_amount(summary.eod_balance),
                format_amount(summary.current_balance),
                summary.balance_last_update_date.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(summaries.len())
    }

    /// Export every ledger entry (two per transaction) to CSV format
    pub fn export_entries_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.all_transactions();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["transaction_id", "account", "amount", "timestamp"])?;

        let mut count = 0;
        for transaction in &transactions {
            for leg in transaction.legs() {
                csv_writer.write_record([
                    leg.transaction_id.to_string(),
                    leg.account_id.clone(),
                    format_amount(leg.amount),
                    leg.timestamp.to_rfc3339(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a full snapshot to JSON format
    pub fn export_snapshot_json<W: Write>(&self, writer: W) -> Result<usize> {
        let snapshot = self.snapshot();
        let count = snapshot.accounts.len();
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(count)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: self.service.clock().now(),
            last_transaction_id: self.service.last_transaction_id(),
            accounts: self.service.list_account_summaries(),
        }
    }
}
