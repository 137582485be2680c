//! Graveyard Ledger - durable record of users, projects, revivals and notes

pub mod memory;
pub mod snapshot;
pub mod store;

pub use memory::MemoryLedger;
pub use snapshot::LedgerSnapshot;
pub use store::{DeletedProject, DeletedUser, LedgerStore, StoreError, StoreResult, REVIVAL_PAIR};
