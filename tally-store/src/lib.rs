//! Tally Storage Layer — the Account Store.
//!
//! Owns account records and exposes the locked-read/update primitives the
//! ledger engine builds its atomic units on.
//!
//! # Architecture
//!
//! - **Repository trait**: unlocked read interface (ports), consumed by the
//!   query service
//! - **In-memory store**: per-account `tokio::sync::Mutex` row locks; the
//!   lock guard is the engine's exclusive handle for the duration of an
//!   atomic unit
//!
//! # Usage
//!
//! ```rust
//! use tally_store::{AccountRepository, MemoryAccountStore};
//! use tally_domain::{AccountType, Currency};
//! use std::time::Duration;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryAccountStore::new();
//!     let usd = Currency::new("USD").unwrap();
//!
//!     let account = store
//!         .create(Uuid::now_v7(), AccountType::Checking, usd)
//!         .await
//!         .unwrap();
//!
//!     // Exclusive handle for an atomic unit
//!     let guard = store
//!         .lock_for_update(account.id, Duration::from_secs(5))
//!         .await
//!         .unwrap();
//!     assert!(guard.balance.is_zero());
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::{AccountGuard, MemoryAccountStore};
pub use repository::AccountRepository;
