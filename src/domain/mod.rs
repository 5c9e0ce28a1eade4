mod account;
mod clock;
mod entry;
mod ledger;
mod money;
mod transfer;

pub use account::*;
pub use clock::*;
pub use entry::*;
pub use ledger::*;
pub use money::*;
pub use transfer::*;
