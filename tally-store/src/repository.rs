//! Repository trait definitions (Ports)
//!
//! Unlocked read access to account records. The exclusive-lock primitive
//! lives on the concrete store (`MemoryAccountStore::lock_for_update`)
//! because lock handles are implementation-specific.

use crate::error::StoreError;
use async_trait::async_trait;
use tally_domain::{Account, AccountId, AccountType, Currency, OwnerId};

/// Repository for Account entities
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a new account with a zero balance and a generated account number
    async fn create(
        &self,
        owner: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<Account, StoreError>;

    /// Unlocked read by account id; `None` if absent
    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Unlocked read by public account number
    async fn get_by_number(&self, number: &str) -> Result<Option<Account>, StoreError>;

    /// All accounts belonging to an owner
    async fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<Account>, StoreError>;
}
