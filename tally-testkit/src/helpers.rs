//! Engine wiring and account seeding helpers.

use anyhow::Result;
use std::sync::Arc;
use tally_domain::{Account, AccountType, Currency};
use tally_ledger::{DepositRequest, LedgerConfig, LedgerEngine};
use tally_query::QueryService;
use tally_store::MemoryAccountStore;
use tally_txlog::MemoryTransactionLog;
use uuid::Uuid;

/// A fully wired in-memory ledger for tests: engine plus the read side over
/// the same store and log
pub struct TestLedger {
    /// Write side
    pub engine: Arc<LedgerEngine>,
    /// Read side, sharing the engine's store and log
    pub queries: QueryService,
}

impl TestLedger {
    /// Wire an engine and query service over fresh in-memory storage
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::test())
    }

    /// Wire with a specific configuration
    pub fn with_config(config: LedgerConfig) -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let log = Arc::new(MemoryTransactionLog::new());
        let engine = Arc::new(LedgerEngine::new(store.clone(), log.clone(), config));
        let queries = QueryService::new(store, log);
        Self { engine, queries }
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a fresh checking account for a generated owner
pub async fn seed_account(engine: &LedgerEngine, currency: Currency) -> Result<Account> {
    Ok(engine
        .open_account(Uuid::now_v7(), AccountType::Checking, currency)
        .await?)
}

/// Open a fresh account and deposit an opening balance into it
pub async fn seed_funded_account(
    engine: &LedgerEngine,
    currency: Currency,
    amount: &str,
) -> Result<Account> {
    let account = seed_account(engine, currency).await?;
    engine
        .deposit(DepositRequest {
            account: account.id,
            amount: amount.to_string(),
            description: Some("Opening balance".to_string()),
            actor: account.owner_id,
            idempotency_key: None,
        })
        .await?;
    Ok(account)
}

// =============================================================================
// Tests
// =============================================================================
