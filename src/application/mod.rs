// Application layer - use cases and orchestration over the in-memory stores

pub mod error;
mod recalculation;
mod service;
mod transfer;

pub use error::*;
pub use recalculation::*;
pub use service::*;
pub use transfer::*;
