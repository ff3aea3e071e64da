//! Data models for Shake Rewards entities

mod balance;
mod claim;
mod ledger;
mod reward;
mod session;

pub use balance::*;
pub use claim::*;
pub use ledger::*;
pub use reward::*;
pub use session::*;
