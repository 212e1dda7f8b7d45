//! Tally Query Service
//!
//! Read-only views over the account store and the transaction log. Queries
//! never take row locks and never mutate; they see each account's latest
//! committed state.
//!
//! Because the engine logs only completed movements, `replay_balance` folds
//! an account's entries from zero and lands exactly on the stored balance.
//! `audit` checks that equality, which is the ledger's core derivability
//! guarantee.

#![warn(clippy::all)]

mod error;
mod service;

pub use error::QueryError;
pub use service::{AuditReport, QueryService};
