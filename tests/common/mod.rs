// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use eod_ledger::application::LedgerService;
use eod_ledger::config::LedgerConfig;
use eod_ledger::domain::{Amount, SettableClock};

/// Helper to create a test service on a clock pinned to the given day
pub fn test_service(date: &str) -> (LedgerService, Arc<SettableClock>) {
    let clock = Arc::new(SettableClock::at_date(parse_date(date)));
    let service = LedgerService::new(clock.clone(), &LedgerConfig::default());
    (service, clock)
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Helper to build a UTC instant on the given day
pub fn at(date_str: &str, hour: u32, minute: u32) -> DateTime<Utc> {
    parse_date(date_str)
        .and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc()
}

pub fn amount(s: &str) -> Amount {
    eod_ledger::domain::parse_amount(s).unwrap()
}

/// Test fixture: Standard account setup
pub struct StandardAccounts;

impl StandardAccounts {
    /// Funding account "bank" (may go negative) plus "alice" and "bob" (may not)
    pub fn create_basic(service: &LedgerService) -> Result<()> {
        service.create_account("bank", true)?;
        service.create_account("alice", false)?;
        service.create_account("bob", false)?;
        Ok(())
    }

    /// Move money from the bank into an account
    pub fn fund(service: &LedgerService, account: &str, value: &str) -> Result<u64> {
        Ok(service.transfer_money("bank", account, amount(value))?)
    }
}
