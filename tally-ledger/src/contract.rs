//! Request and response contracts for ledger operations.
//!
//! Amounts cross this boundary as decimal strings and are parsed against the
//! target account's currency inside the engine. Receipts carry the
//! post-operation balance of every touched account so callers never need a
//! follow-up read.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use tally_domain::{AccountId, ActorId, Money, TransactionId};

// =============================================================================
// Requests
// =============================================================================

/// Request to credit external funds into one account
#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    /// Destination account
    pub account: AccountId,
    /// Decimal amount string, e.g. "100.00"
    pub amount: String,
    /// Optional caller description
    pub description: Option<String>,
    /// Actor initiating the operation
    pub actor: ActorId,
    /// Optional idempotency key for safe retries
    pub idempotency_key: Option<String>,
}

/// Request to debit funds out of one account
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawRequest {
    /// Source account
    pub account: AccountId,
    /// Decimal amount string
    pub amount: String,
    /// Optional caller description
    pub description: Option<String>,
    /// Actor initiating the operation
    pub actor: ActorId,
    /// Optional idempotency key for safe retries
    pub idempotency_key: Option<String>,
}

/// Request to move funds between two accounts atomically
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    /// Debited account
    pub from: AccountId,
    /// Credited account
    pub to: AccountId,
    /// Decimal amount string
    pub amount: String,
    /// Optional caller description
    pub description: Option<String>,
    /// Actor initiating the operation
    pub actor: ActorId,
    /// Optional idempotency key for safe retries
    pub idempotency_key: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// Post-operation balance of one touched account
#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    /// Account id
    pub account: AccountId,
    /// Balance after the operation
    pub balance: Money,
}

/// Successful operation outcome
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    /// Id of the ledger entry this operation recorded
    pub transaction_id: TransactionId,
    /// Post-operation balances, source first for transfers
    pub balances: Vec<AccountBalance>,
    /// True when this receipt was served from the idempotency cache rather
    /// than re-executed
    pub replayed: bool,
}

/// Terminal status of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Balances changed and an entry was recorded
    Success,
    /// Nothing changed
    Failure,
}

/// Flattened operation outcome for callers that want a single wire shape
/// instead of a `Result`
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    /// Success or failure
    pub status: OperationStatus,
    /// Post-operation balances; empty on failure
    pub balances: Vec<AccountBalance>,
    /// Recorded entry id; absent on failure
    pub transaction_id: Option<TransactionId>,
    /// Stable error code; absent on success
    pub error_kind: Option<&'static str>,
    /// Human-readable error message; absent on success
    pub error_message: Option<String>,
}

impl From<Result<Receipt, LedgerError>> for OperationResult {
    fn from(result: Result<Receipt, LedgerError>) -> Self {
        match result {
            Ok(receipt) => Self {
                status: OperationStatus::Success,
                balances: receipt.balances,
                transaction_id: Some(receipt.transaction_id),
                error_kind: None,
                error_message: None,
            },
            Err(err) => Self {
                status: OperationStatus::Failure,
                balances: Vec::new(),
                transaction_id: None,
                error_kind: Some(err.kind()),
                error_message: Some(err.to_string()),
            },
        }
    }
}
