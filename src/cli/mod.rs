use std::fs::File;
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::application::LedgerService;
use crate::config::{DEFAULT_RECALCULATION_WORKERS, LedgerConfig};
use crate::domain::{SettableClock, format_amount};
use crate::io::{Exporter, ImportOptions, ImportResult, Importer, earliest_transfer_timestamp};
use crate::logging::{LogFormat, init_logging};

/// eod-ledger - in-memory double-entry ledger
#[derive(Parser)]
#[command(name = "eod-ledger")]
#[command(about = "Replay accounts and transfers through an in-memory ledger with nightly EOD snapshots")]
#[command(version)]
pub struct Cli {
    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, env = "LEDGER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format: pretty, json
    #[arg(long, global = true, env = "LEDGER_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Number of accounts recalculated concurrently
    #[arg(short, long, global = true, env = "LEDGER_RECALC_WORKERS", default_value_t = DEFAULT_RECALCULATION_WORKERS)]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load accounts, replay transfers in order, and print the resulting balances
    Replay {
        /// Accounts CSV: id,negative_balance_allowed
        #[arg(long)]
        accounts: PathBuf,

        /// Transfers CSV: timestamp,from,to,amount (oldest first)
        #[arg(long)]
        transfers: PathBuf,

        /// Run a final recalculation as of midnight of this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<String>,

        /// Output format: table, csv, json
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every ledger entry instead of balances (csv only)
        #[arg(long)]
        entries: bool,

        /// Don't recalculate when the replay crosses midnight
        #[arg(long)]
        no_daily_recalculation: bool,

        /// Count duplicate accounts as skipped instead of as errors
        #[arg(long)]
        skip_duplicates: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_logging(&self.log_level, self.log_format);

        let config = LedgerConfig::default().with_recalculation_workers(self.workers);
        config.validate()?;

        match self.command {
            Commands::Replay {
                accounts,
                transfers,
                as_of,
                format,
                output,
                entries,
                no_daily_recalculation,
                skip_duplicates,
            } => {
                let options = ImportOptions {
                    skip_duplicates,
                    recalculate_daily: !no_daily_recalculation,
                };
                let as_of = as_of.as_deref().map(parse_date).transpose()?;
                run_replay(
                    &config,
                    &accounts,
                    &transfers,
                    as_of,
                    &options,
                    &format,
                    output.as_ref(),
                    entries,
                )
                .await?;
            }
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_replay(
    config: &LedgerConfig,
    accounts_path: &PathBuf,
    transfers_path: &PathBuf,
    as_of: Option<NaiveDate>,
    options: &ImportOptions,
    format: &str,
    output: Option<&PathBuf>,
    entries: bool,
) -> Result<()> {
    let transfers_csv = std::fs::read_to_string(transfers_path)
        .with_context(|| format!("Failed to read transfers file: {}", transfers_path.display()))?;
    let accounts_file = File::open(accounts_path)
        .with_context(|| format!("Failed to open accounts file: {}", accounts_path.display()))?;

    // Accounts exist from the moment the first transfer happens
    let start = earliest_transfer_timestamp(transfers_csv.as_bytes()).unwrap_or_else(Utc::now);
    let clock = Arc::new(SettableClock::new(start));
    let service = LedgerService::new(clock.clone(), config);
    let importer = Importer::new(&service, clock);

    let account_result = importer.import_accounts_csv(accounts_file, options)?;
    print_import_result("Accounts", &account_result);

    let transfer_result = importer
        .replay_transfers_csv(transfers_csv.as_bytes(), options)
        .await?;
    print_import_result("Transfers", &transfer_result);
    if !transfer_result.recalculations.is_empty() {
        eprintln!(
            "  Nightly recalculations: {}",
            transfer_result.recalculations.len()
        );
    }

    if let Some(date) = as_of {
        let report = importer.finish_at(date).await;
        eprintln!(
            "Recalculated as of {}: {} updated, {} unchanged, {} failed",
            report.as_of, report.updated, report.unchanged, report.failed
        );
    }

    service
        .reconcile()
        .context("Replayed ledger failed reconciliation")?;
    info!(
        transactions = service.last_transaction_id(),
        accounts = service.account_count(),
        "replay finished"
    );

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let exporter = Exporter::new(&service);
    match (format, entries) {
        ("csv", true) => {
            exporter.export_entries_csv(writer)?;
        }
        (_, true) => {
            anyhow::bail!("--entries is only available with --format csv");
        }
        ("csv", false) => {
            exporter.export_balances_csv(writer)?;
        }
        ("json", false) => {
            exporter.export_snapshot_json(writer)?;
        }
        ("table", false) => {
            write_balance_table(&service, writer)?;
        }
        _ => {
            anyhow::bail!("Invalid format '{}'. Valid formats: table, csv, json", format);
        }
    }

    Ok(())
}

fn write_balance_table<W: Write>(service: &LedgerService, mut writer: W) -> Result<()> {
    let summaries = service.list_account_summaries();
    if summaries.is_empty() {
        writeln!(writer, "No accounts found.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<20} {:>15} {:>15} {:<12} {}",
        "ACCOUNT", "EOD BALANCE", "CURRENT", "AS OF", "NEGATIVE"
    )?;
    writeln!(writer, "{}", "-".repeat(75))?;
    for summary in &summaries {
        writeln!(
            writer,
            "{:<20} {:>15} {:>15} {:<12} {}",
            truncate(&summary.account_id, 20),
            format_amount(summary.eod_balance),
            format_amount(summary.current_balance),
            summary.balance_last_update_date,
            if summary.negative_balance_allowed { "allowed" } else { "-" }
        )?;
    }
    writeln!(writer, "{}", "-".repeat(75))?;
    writeln!(
        writer,
        "{} accounts, {} transactions",
        summaries.len(),
        service.last_transaction_id()
    )?;
    Ok(())
}

fn print_import_result(label: &str, result: &ImportResult) {
    eprintln!("{} imported", label);
    eprintln!("  Imported: {}", result.imported);
    eprintln!("  Skipped:  {}", result.skipped);
    eprintln!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        for error in result.errors.iter().take(10) {
            eprintln!(
                "    Line {}: {}{}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("[{}] ", f))
                    .unwrap_or_default(),
                error.error
            );
        }
        if result.errors.len() > 10 {
            eprintln!("    ... and {} more errors", result.errors.len() - 10);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}
