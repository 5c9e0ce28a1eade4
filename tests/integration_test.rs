mod common;

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use common::{amount, at, parse_date};
use eod_ledger::cli::Cli;
use eod_ledger::config::LedgerConfig;
use eod_ledger::domain::SettableClock;
use eod_ledger::io::{ImportOptions, Importer, LedgerSnapshot, earliest_transfer_timestamp};
use eod_ledger::LedgerService;
use tempfile::TempDir;

const ACCOUNTS_CSV: &str = "\
id,negative_balance_allowed
bank,true
alice,false
bob,no
alice,false
";

const TRANSFERS_CSV: &str = "\
timestamp,from,to,amount
2024-01-01T09:00:00Z,bank,alice,100
2024-01-01T17:00:00Z,alice,bob,30
2024-01-02T08:00:00Z,alice,bob,80
2024-01-02T09:00:00Z,bob,ghost,1
2024-01-01T10:00:00Z,bank,bob,1
2024-01-03T12:00:00Z,bob,alice,10
";

/// Helper to write the sample CSVs into a temporary directory
fn write_inputs() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("accounts.csv"), ACCOUNTS_CSV)?;
    fs::write(temp_dir.path().join("transfers.csv"), TRANSFERS_CSV)?;
    Ok(temp_dir)
}

#[tokio::test]
async fn test_replay_with_nightly_recalculation() -> Result<()> {
    let start = earliest_transfer_timestamp(TRANSFERS_CSV.as_bytes()).expect("has transfers");
    assert_eq!(start, at("2024-01-01", 9, 0));

    let clock = Arc::new(SettableClock::new(start));
    let service = LedgerService::new(clock.clone(), &LedgerConfig::default());
    let importer = Importer::new(&service, clock);
    let options = ImportOptions::default();

    let accounts = importer.import_accounts_csv(ACCOUNTS_CSV.as_bytes(), &options)?;
    assert_eq!(accounts.imported, 3);
    assert_eq!(accounts.errors.len(), 1);
    assert_eq!(accounts.errors[0].line, 5);

    let transfers = importer
        .replay_transfers_csv(TRANSFERS_CSV.as_bytes(), &options)
        .await?;

    assert_eq!(transfers.imported, 3);
    let failed_lines: Vec<usize> = transfers.errors.iter().map(|e| e.line).collect();
    assert_eq!(failed_lines, vec![4, 5, 6]);
    assert!(transfers.errors[0].error.contains("Insufficient"));

    // One pass on the 2nd (folding the 1st) and one on the 3rd (folding the 2nd)
    let as_of: Vec<_> = transfers.recalculations.iter().map(|r| r.as_of).collect();
    assert_eq!(as_of, vec![parse_date("2024-01-01"), parse_date("2024-01-02")]);

    let alice = service.account_summary("alice")?;
    assert_eq!(alice.eod_balance, amount("70"));
    assert_eq!(alice.current_balance, amount("80"));
    assert_eq!(alice.balance_last_update_date, parse_date("2024-01-02"));

    let report = importer.finish_at(parse_date("2024-01-04")).await;
    assert_eq!(report.as_of, parse_date("2024-01-03"));
    assert_eq!(report.updated, 3);

    let bob = service.account_summary("bob")?;
    assert_eq!(bob.eod_balance, amount("20"));
    assert_eq!(bob.current_balance, amount("20"));
    assert_eq!(service.last_transaction_id(), 3);
    Ok(())
}

#[tokio::test]
async fn test_replay_without_daily_recalculation() -> Result<()> {
    let clock = Arc::new(SettableClock::new(at("2024-01-01", 9, 0)));
    let service = LedgerService::new(clock.clone(), &LedgerConfig::default());
    let importer = Importer::new(&service, clock);
    let options = ImportOptions {
        skip_duplicates: true,
        recalculate_daily: false,
    };

    let accounts = importer.import_accounts_csv(ACCOUNTS_CSV.as_bytes(), &options)?;
    assert_eq!(accounts.skipped, 1);
    assert!(accounts.errors.is_empty());

    let transfers = importer
        .replay_transfers_csv(TRANSFERS_CSV.as_bytes(), &options)
        .await?;

    assert!(transfers.recalculations.is_empty());
    let alice = service.account_summary("alice")?;
    assert_eq!(alice.eod_balance, amount("0"));
    assert_eq!(alice.current_balance, amount("80"));
    assert_eq!(alice.balance_last_update_date, parse_date("2023-12-31"));
    Ok(())
}

#[tokio::test]
async fn test_cli_replay_writes_csv_balances() -> Result<()> {
    let temp = write_inputs()?;
    let output = temp.path().join("balances.csv");

    let cli = Cli::try_parse_from([
        "eod-ledger".to_string(),
        "--log-level".to_string(),
        "error".to_string(),
        "--workers".to_string(),
        "2".to_string(),
        "replay".to_string(),
        "--accounts".to_string(),
        temp.path().join("accounts.csv").display().to_string(),
        "--transfers".to_string(),
        temp.path().join("transfers.csv").display().to_string(),
        "--as-of".to_string(),
        "2024-01-04".to_string(),
        "--format".to_string(),
        "csv".to_string(),
        "--output".to_string(),
        output.display().to_string(),
    ])?;
    assert_eq!(cli.log_level, "error");
    cli.run().await?;

    let text = fs::read_to_string(&output)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "alice,false,80.00,80.00,2024-01-03");
    assert_eq!(lines[2], "bank,true,-100.00,-100.00,2024-01-03");
    assert_eq!(lines[3], "bob,false,20.00,20.00,2024-01-03");
    Ok(())
}

#[tokio::test]
async fn test_cli_replay_writes_json_snapshot() -> Result<()> {
    let temp = write_inputs()?;
    let output = temp.path().join("snapshot.json");

    let cli = Cli::try_parse_from([
        "eod-ledger".to_string(),
        "--log-level".to_string(),
        "error".to_string(),
        "replay".to_string(),
        "--accounts".to_string(),
        temp.path().join("accounts.csv").display().to_string(),
        "--transfers".to_string(),
        temp.path().join("transfers.csv").display().to_string(),
        "-f".to_string(),
        "json".to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ])?;
    cli.run().await?;

    let snapshot: LedgerSnapshot = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(snapshot.last_transaction_id, 3);
    let ids: Vec<&str> = snapshot
        .accounts
        .iter()
        .map(|a| a.account_id.as_str())
        .collect();
    assert_eq!(ids, vec!["alice", "bank", "bob"]);
    assert_eq!(snapshot.accounts[0].current_balance, amount("80"));
    Ok(())
}

#[tokio::test]
async fn test_cli_rejects_entries_outside_csv() -> Result<()> {
    let temp = write_inputs()?;

    let cli = Cli::try_parse_from([
        "eod-ledger".to_string(),
        "--log-level".to_string(),
        "error".to_string(),
        "replay".to_string(),
        "--accounts".to_string(),
        temp.path().join("accounts.csv").display().to_string(),
        "--transfers".to_string(),
        temp.path().join("transfers.csv").display().to_string(),
        "--entries".to_string(),
        "--format".to_string(),
        "json".to_string(),
        "--output".to_string(),
        temp.path().join("out.json").display().to_string(),
    ])?;

    let err = cli.run().await.unwrap_err();
    assert!(err.to_string().contains("--entries"));
    Ok(())
}

#[tokio::test]
async fn test_cli_missing_input_file() -> Result<()> {
    let temp = TempDir::new()?;

    let cli = Cli::try_parse_from([
        "eod-ledger".to_string(),
        "--log-level".to_string(),
        "error".to_string(),
        "replay".to_string(),
        "--accounts".to_string(),
        temp.path().join("nope.csv").display().to_string(),
        "--transfers".to_string(),
        temp.path().join("nope.csv").display().to_string(),
    ])?;

    let err = cli.run().await.unwrap_err();
    assert!(err.to_string().contains("Failed to read transfers file"));
    Ok(())
}
