//! In-memory account store.
//!
//! Each account row pairs a canonical snapshot behind a `std::sync::RwLock`
//! with a `tokio::sync::Mutex` row lock. `lock_for_update` returns a guard
//! that holds the row lock and a working copy of the account; the copy is
//! written back to the snapshot when the guard is released. Unlocked reads
//! serve the snapshot directly and never wait on a held row lock.

use crate::error::StoreError;
use crate::repository::AccountRepository;
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tally_domain::{Account, AccountId, AccountType, Currency, OwnerId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

#[derive(Clone)]
struct AccountCell {
    /// Canonical snapshot, readable without the row lock
    data: Arc<RwLock<Account>>,
    /// Row lock serializing atomic units
    lock: Arc<Mutex<()>>,
}

/// Exclusive handle on one account row, held for an atomic unit
///
/// Dereferences to the account's working copy. Mutations become canonical
/// when the guard drops; until then unlocked readers see the prior snapshot.
pub struct AccountGuard {
    account: Account,
    data: Arc<RwLock<Account>>,
    _permit: OwnedMutexGuard<()>,
}

impl Deref for AccountGuard {
    type Target = Account;

    fn deref(&self) -> &Account {
        &self.account
    }
}

impl DerefMut for AccountGuard {
    fn deref_mut(&mut self) -> &mut Account {
        &mut self.account
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        // Runs before the row lock permit is released
        *self.data.write().unwrap() = self.account.clone();
    }
}

/// In-memory account store with per-account row locks
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, AccountCell>>,
    numbers: RwLock<HashMap<String, AccountId>>,
}

impl MemoryAccountStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            numbers: RwLock::new(HashMap::new()),
        }
    }

    /// Number of accounts in the store
    pub fn account_count(&self) -> usize {
        self.accounts.read().unwrap().len()
    }

    /// Acquire the exclusive row lock for one account
    ///
    /// Blocks until the lock is free or `timeout` elapses. This is the only
    /// blocking point in the ledger; timing out performs no mutation and the
    /// caller may retry.
    ///
    /// # Errors
    /// - `StoreError::NotFound` if the account does not exist
    /// - `StoreError::LockTimeout` if the lock is not acquired in time
    pub async fn lock_for_update(
        &self,
        id: AccountId,
        timeout: Duration,
    ) -> Result<AccountGuard, StoreError> {
        let cell = self
            .cell(id)
            .ok_or_else(|| StoreError::not_found("account", id.to_string()))?;

        match tokio::time::timeout(timeout, cell.lock.clone().lock_owned()).await {
            Ok(permit) => {
                debug!(account = %id, "account lock acquired");
                let account = cell.data.read().unwrap().clone();
                Ok(AccountGuard {
                    account,
                    data: cell.data,
                    _permit: permit,
                })
            }
            Err(_) => {
                warn!(account = %id, timeout_ms = timeout.as_millis() as u64, "account lock timed out");
                Err(StoreError::LockTimeout {
                    account: id,
                    waited_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Resolve an account id from a public account number
    pub fn resolve_number(&self, number: &str) -> Option<AccountId> {
        self.numbers.read().unwrap().get(number).copied()
    }

    fn cell(&self, id: AccountId) -> Option<AccountCell> {
        self.accounts.read().unwrap().get(&id).cloned()
    }

    fn generate_account_number(&self) -> String {
        // 12 random digits, retried until unique (original system behavior)
        let numbers = self.numbers.read().unwrap();
        let mut rng = rand::thread_rng();
        loop {
            let candidate: String = (0..12).map(|_| rng.gen_range(0..10u8).to_string()).collect();
            if !numbers.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountStore {
    async fn create(
        &self,
        owner: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<Account, StoreError> {
        let account_number = self.generate_account_number();
        let account = Account::open(owner, account_number.clone(), account_type, currency);

        {
            let mut numbers = self.numbers.write().unwrap();
            if numbers.contains_key(&account_number) {
                return Err(StoreError::duplicate("account", account_number));
            }
            numbers.insert(account_number, account.id);
        }
        self.accounts.write().unwrap().insert(
            account.id,
            AccountCell {
                data: Arc::new(RwLock::new(account.clone())),
                lock: Arc::new(Mutex::new(())),
            },
        );

        debug!(account = %account.id, number = %account.account_number, "account created");
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.cell(id).map(|cell| cell.data.read().unwrap().clone()))
    }

    async fn get_by_number(&self, number: &str) -> Result<Option<Account>, StoreError> {
        match self.resolve_number(number) {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    async fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<Account>, StoreError> {
        let cells: Vec<AccountCell> = self.accounts.read().unwrap().values().cloned().collect();

        Ok(cells
            .iter()
            .map(|cell| cell.data.read().unwrap().clone())
            .filter(|account| account.owner_id == owner)
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
