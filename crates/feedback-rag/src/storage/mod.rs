//! Storage module for the reward ledger
//!
//! The ledger is the system of record for feedback; the bandit state is a
//! cache rebuilt from it at startup.

mod database;
pub mod ledger;

pub use database::SqliteLedger;
pub use ledger::{RewardLedger, UnavailableLedger};
