//! Tally Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains the Money value object, account and ledger-entry entities,
//! and the domain validation rules.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod money;

// Re-export commonly used types
pub use entities::{
    Account, AccountId, AccountType, ActorId, EntryKind, EntryStatus, LedgerEntry, OwnerId,
    TransactionId,
};
pub use money::{Currency, DomainError, Money};
