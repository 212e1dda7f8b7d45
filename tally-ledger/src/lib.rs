//! Tally Ledger Engine
//!
//! The atomic funds-movement core: validates a requested movement between
//! one or two accounts, acquires per-account row locks in a fixed total
//! order, applies the balance changes, and records exactly one ledger entry,
//! all as a single indivisible unit.
//!
//! Guarantees:
//! - money is neither created nor destroyed (transfers are zero-sum)
//! - no balance ever goes negative
//! - no lost updates and no deadlocks under concurrent callers
//! - the transaction log and the balances are always derivable from each
//!   other: only completed, balance-affecting operations are logged
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_domain::{AccountType, Currency};
//! use tally_ledger::{DepositRequest, LedgerConfig, LedgerEngine};
//! use tally_store::MemoryAccountStore;
//! use tally_txlog::MemoryTransactionLog;
//! use uuid::Uuid;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = LedgerEngine::new(
//!     Arc::new(MemoryAccountStore::new()),
//!     Arc::new(MemoryTransactionLog::new()),
//!     LedgerConfig::default(),
//! );
//!
//! let usd = Currency::new("USD")?;
//! let account = engine
//!     .open_account(Uuid::now_v7(), AccountType::Checking, usd)
//!     .await?;
//!
//! let receipt = engine
//!     .deposit(DepositRequest {
//!         account: account.id,
//!         amount: "100.00".to_string(),
//!         description: None,
//!         actor: account.owner_id,
//!         idempotency_key: None,
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

mod config;
mod contract;
mod engine;
mod error;
mod idempotency;

pub use config::{ConfigError, LedgerConfig};
pub use contract::{
    AccountBalance, DepositRequest, OperationResult, OperationStatus, Receipt, TransferRequest,
    WithdrawRequest,
};
pub use engine::LedgerEngine;
pub use error::LedgerError;
pub use idempotency::request_fingerprint;
