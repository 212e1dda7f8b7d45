//! Ledger engine error types.
//!
//! Every failure kind carries a stable machine-readable code (`kind()`) plus
//! a human message (`Display`). All validation failures are raised before
//! any mutation; `Persistence` is the one kind whose outcome the caller must
//! treat as unknown.

use tally_domain::{AccountId, DomainError};
use tally_store::StoreError;
use tally_txlog::TxLogError;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount malformed, non-positive, or over-precise
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Accounts (or amount and account) are denominated differently
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Source-side currency
        expected: String,
        /// Destination-side currency
        actual: String,
    },

    /// Transfer where source and destination are the same account
    #[error("Source and destination accounts must differ")]
    SameAccount,

    /// Referenced account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Referenced account has been deactivated
    #[error("Account is inactive: {0}")]
    AccountInactive(AccountId),

    /// Debit would drive the balance below zero
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance available before the debit
        available: String,
        /// Amount the debit requested
        requested: String,
    },

    /// Row lock not acquired within the caller's timeout; nothing mutated
    #[error("Lock timeout on account {0}")]
    LockTimeout(AccountId),

    /// Storage failure during the atomic unit; outcome unknown, retry with
    /// an idempotency key
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Idempotency key reused with a different request payload
    #[error("Idempotency key {key} reused with a different request")]
    DuplicateRequest {
        /// The offending key
        key: String,
    },
}

impl LedgerError {
    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::CurrencyMismatch { .. } => "currency_mismatch",
            LedgerError::SameAccount => "same_account",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::AccountInactive(_) => "account_inactive",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::LockTimeout(_) => "lock_timeout",
            LedgerError::Persistence(_) => "persistence_error",
            LedgerError::DuplicateRequest { .. } => "duplicate_request",
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidAmount(msg) => LedgerError::InvalidAmount(msg),
            DomainError::InvalidCurrency(msg) => {
                LedgerError::InvalidAmount(format!("invalid currency: {}", msg))
            }
            DomainError::InvalidAccountType(msg) => {
                LedgerError::InvalidAmount(format!("invalid account type: {}", msg))
            }
            DomainError::CurrencyMismatch { expected, actual } => {
                LedgerError::CurrencyMismatch { expected, actual }
            }
            DomainError::InsufficientFunds { available, requested } => {
                LedgerError::InsufficientFunds { available, requested }
            }
            DomainError::SameAccount => LedgerError::SameAccount,
            DomainError::AccountInactive(id) => LedgerError::AccountInactive(id),
            DomainError::InvalidEntry(msg) => LedgerError::InvalidAmount(msg),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => LedgerError::AccountNotFound(id),
            StoreError::Duplicate { entity_type, id } => {
                LedgerError::Persistence(format!("duplicate {} {}", entity_type, id))
            }
            StoreError::LockTimeout { account, .. } => LedgerError::LockTimeout(account),
            StoreError::Domain(domain) => domain.into(),
        }
    }
}

impl From<TxLogError> for LedgerError {
    fn from(err: TxLogError) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_error_codes() {
        assert_eq!(
            LedgerError::InvalidAmount("x".into()).kind(),
            "invalid_amount"
        );
        assert_eq!(LedgerError::SameAccount.kind(), "same_account");
        assert_eq!(
            LedgerError::InsufficientFunds {
                available: "1.00 USD".into(),
                requested: "2.00 USD".into()
            }
            .kind(),
            "insufficient_funds"
        );
        assert_eq!(
            LedgerError::Persistence("io".into()).kind(),
            "persistence_error"
        );
    }

    #[test]
    fn test_domain_error_mapping() {
        let err: LedgerError = DomainError::SameAccount.into();
        assert_eq!(err.kind(), "same_account");

        let err: LedgerError = DomainError::InsufficientFunds {
            available: "1.00 USD".into(),
            requested: "2.00 USD".into(),
        }
        .into();
        assert_eq!(err.kind(), "insufficient_funds");
    }
}
