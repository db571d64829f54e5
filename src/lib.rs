//! Lending ledger core
//!
//! Tracks equipment circulating between a custodian pool and borrowers:
//! asset registration, borrow and return records, overdue detection, and
//! deterministic report exports. State lives in a shared persisted
//! key-value store; several execution contexts may hold a [`Ledger`] over
//! the same store and converge through change notifications (last writer
//! wins per slice).

pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod overdue;
pub mod report;
pub mod rules;
pub mod store;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use store::StoreHandle;
