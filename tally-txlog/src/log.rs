//! Transaction log trait (Port)

use crate::types::{EntryFilter, Page, Result};
use async_trait::async_trait;
use tally_domain::{AccountId, LedgerEntry, TransactionId};

/// Append-only log of completed balance movements
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Append one entry; never partially writes
    ///
    /// # Errors
    /// - `TxLogError::Duplicate` if the entry id was already appended
    /// - `TxLogError::Storage` on storage failure
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry>;

    /// Look up one entry by id
    async fn get(&self, id: TransactionId) -> Result<Option<LedgerEntry>>;

    /// Entries touching an account, newest first
    async fn list_for_account(
        &self,
        account: AccountId,
        filter: EntryFilter,
        page: Page,
    ) -> Result<Vec<LedgerEntry>>;

    /// Every entry in append order; used by conservation audits
    async fn list_all(&self) -> Result<Vec<LedgerEntry>>;
}
