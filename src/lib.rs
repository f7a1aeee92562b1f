//! Shared coin ledger for a small group of players.
//!
//! * [`ledger`]: roster, transaction log and their persistence.
//! * [`transfer`]: validation and application of password-gated transfers.
//! * [`storage`]: key-value providers the ledger persists through.
//! * [`logfile`]: plain-text export/import of the transaction log.
//! * [`tiles`]: island sizing for rendering balances.
//!
//! Everything here is synchronous and UI-agnostic; the `islands` binary is
//! one front end over it.

pub mod config;
pub mod ledger;
pub mod logfile;
pub mod logging;
pub mod storage;
pub mod tiles;
pub mod transfer;

pub use ledger::{LedgerEntry, LedgerError, LedgerStore, Player};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use transfer::{TransactionProcessor, TransferError, TransferRequest};
