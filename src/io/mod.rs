// CSV/JSON import and export around an in-memory ledger

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;
