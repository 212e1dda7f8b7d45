//! Query service errors.

use tally_domain::DomainError;
use tally_store::StoreError;
use tally_txlog::TxLogError;
use thiserror::Error;

/// Read-side errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Referenced account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Underlying log failure
    #[error("Log error: {0}")]
    Log(#[from] TxLogError),

    /// Domain-level failure while reconstructing state
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
