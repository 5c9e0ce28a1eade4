mod registry;
mod transaction_log;

use chrono::NaiveDate;
use thiserror::Error;

pub use registry::*;
pub use transaction_log::*;

/// Failures raised by the in-memory stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Invalid date range: {from} must be earlier than {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
}
