//! Transaction Log Module
//!
//! Append-only record of completed balance movements:
//! - entries are immutable once appended and never partially written
//! - queryable per account, newest first, with restartable offset pagination
//! - replaying an account's entries from zero reproduces its balance
//!
//! The in-memory log is the default; the `postgres` feature adds a durable
//! sqlx-backed implementation with the same contract.

#![warn(clippy::all)]

mod log;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod types;

pub use log::TransactionLog;
pub use memory::MemoryTransactionLog;
#[cfg(feature = "postgres")]
pub use postgres::PgTransactionLog;
pub use types::{EntryFilter, Page, Result, TxLogError};
