//! Read-only queries over store and log.

use crate::error::QueryError;
use std::sync::Arc;
use tally_domain::{Account, AccountId, LedgerEntry, Money, OwnerId, TransactionId};
use tally_store::{AccountRepository, MemoryAccountStore};
use tally_txlog::{EntryFilter, Page, TransactionLog};
use tracing::debug;

/// Read-only view over an account store and a transaction log
pub struct QueryService {
    store: Arc<MemoryAccountStore>,
    log: Arc<dyn TransactionLog>,
}

/// Result of auditing one account's stored balance against its log history
#[derive(Debug, Clone)]
pub struct AuditReport {
    /// Audited account
    pub account: AccountId,
    /// Balance as held by the store
    pub stored: Money,
    /// Balance reproduced by folding the account's log entries from zero
    pub replayed: Money,
}

impl AuditReport {
    /// True when the log exactly reproduces the stored balance
    pub fn consistent(&self) -> bool {
        self.stored == self.replayed
    }
}

impl QueryService {
    /// Create a query service over the given store and log
    pub fn new(store: Arc<MemoryAccountStore>, log: Arc<dyn TransactionLog>) -> Self {
        Self { store, log }
    }

    /// Fetch one account
    pub async fn account(&self, id: AccountId) -> Result<Account, QueryError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| QueryError::AccountNotFound(id.to_string()))
    }

    /// Fetch one account by its public account number
    pub async fn account_by_number(&self, number: &str) -> Result<Account, QueryError> {
        self.store
            .get_by_number(number)
            .await?
            .ok_or_else(|| QueryError::AccountNotFound(number.to_string()))
    }

    /// All accounts belonging to an owner
    pub async fn accounts_for_owner(&self, owner: OwnerId) -> Result<Vec<Account>, QueryError> {
        Ok(self.store.list_for_owner(owner).await?)
    }

    /// Current balance of one account
    pub async fn balance(&self, id: AccountId) -> Result<Money, QueryError> {
        Ok(self.account(id).await?.balance)
    }

    /// An account's movement history, newest first
    pub async fn history(
        &self,
        id: AccountId,
        filter: EntryFilter,
        page: Page,
    ) -> Result<Vec<LedgerEntry>, QueryError> {
        // Fail on unknown accounts rather than returning an empty page
        self.account(id).await?;
        Ok(self.log.list_for_account(id, filter, page).await?)
    }

    /// Look up one ledger entry
    pub async fn entry(&self, id: TransactionId) -> Result<Option<LedgerEntry>, QueryError> {
        Ok(self.log.get(id).await?)
    }

    /// Reproduce an account's balance by folding its entries from zero
    pub async fn replay_balance(&self, id: AccountId) -> Result<Money, QueryError> {
        let account = self.account(id).await?;
        let entries = self.log.list_all().await?;

        let minor_units: i64 = entries.iter().map(|entry| entry.signed_delta(id)).sum();
        debug!(account = %id, minor_units, entries = entries.len(), "balance replayed");
        Ok(Money::from_minor_units(
            minor_units,
            account.currency().clone(),
        )?)
    }

    /// Audit one account: stored balance versus log-replayed balance
    pub async fn audit(&self, id: AccountId) -> Result<AuditReport, QueryError> {
        let stored = self.balance(id).await?;
        let replayed = self.replay_balance(id).await?;
        Ok(AuditReport {
            account: id,
            stored,
            replayed,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
