//! Concurrency properties: no lost updates, no deadlocks, conservation.

use std::sync::Arc;
use std::time::Duration;
use tally_domain::{AccountType, Currency, LedgerEntry, TransactionId};
use tally_ledger::{DepositRequest, LedgerConfig, LedgerEngine, TransferRequest, WithdrawRequest};
use tally_store::{AccountRepository, MemoryAccountStore};
use tally_txlog::{EntryFilter, MemoryTransactionLog, Page, TransactionLog};
use uuid::Uuid;

fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

fn shared_engine() -> Arc<LedgerEngine> {
    Arc::new(LedgerEngine::new(
        Arc::new(MemoryAccountStore::new()),
        Arc::new(MemoryTransactionLog::new()),
        LedgerConfig {
            lock_timeout: std::time::Duration::from_secs(5),
            ..LedgerConfig::test()
        },
    ))
}

async fn balance_minor(engine: &LedgerEngine, account: Uuid) -> i64 {
    engine
        .store()
        .get(account)
        .await
        .unwrap()
        .unwrap()
        .balance
        .minor_units()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_deposits_no_lost_updates() {
    let engine = shared_engine();
    let account = engine.open_account(Uuid::now_v7(), AccountType::Checking, usd()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let engine = engine.clone();
        let id = account.id;
        let actor = account.owner_id;
        handles.push(tokio::spawn(async move {
            engine
                .deposit(DepositRequest {
                    account: id,
                    amount: "1.00".to_string(),
                    description: None,
                    actor,
                    idempotency_key: None,
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(balance_minor(&engine, account.id).await, 5_000);
    assert_eq!(engine.log().list_all().await.unwrap().len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_no_deadlock() {
    let engine = shared_engine();
    let a = engine.open_account(Uuid::now_v7(), AccountType::Checking, usd()).await.unwrap();
    let b = engine.open_account(Uuid::now_v7(), AccountType::Checking, usd()).await.unwrap();

    for (account, actor) in [(a.id, a.owner_id), (b.id, b.owner_id)] {
        engine
            .deposit(DepositRequest {
                account,
                amount: "1000.00".to_string(),
                description: None,
                actor,
                idempotency_key: None,
            })
            .await
            .unwrap();
    }

    // Transfers in both directions at once; ordered locking keeps this
    // from ever deadlocking
    let mut handles = Vec::new();
    for i in 0..40 {
        let engine = engine.clone();
        let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
        let actor = a.owner_id;
        handles.push(tokio::spawn(async move {
            engine
                .transfer(TransferRequest {
                    from,
                    to,
                    amount: "5.00".to_string(),
                    description: None,
                    actor,
                    idempotency_key: None,
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Equal counts in each direction cancel out; conservation holds either way
    let total = balance_minor(&engine, a.id).await + balance_minor(&engine, b.id).await;
    assert_eq!(total, 200_000);
    assert_eq!(balance_minor(&engine, a.id).await, 100_000);
    assert_eq!(balance_minor(&engine, b.id).await, 100_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let engine = shared_engine();
    let account = engine.open_account(Uuid::now_v7(), AccountType::Checking, usd()).await.unwrap();
    engine
        .deposit(DepositRequest {
            account: account.id,
            amount: "100.00".to_string(),
            description: None,
            actor: account.owner_id,
            idempotency_key: None,
        })
        .await
        .unwrap();

    // 30 withdrawals of 10.00 against a 100.00 balance: exactly 10 succeed
    let mut handles = Vec::new();
    for _ in 0..30 {
        let engine = engine.clone();
        let id = account.id;
        let actor = account.owner_id;
        handles.push(tokio::spawn(async move {
            engine
                .withdraw(WithdrawRequest {
                    account: id,
                    amount: "10.00".to_string(),
                    description: None,
                    actor,
                    idempotency_key: None,
                })
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(balance_minor(&engine, account.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_log_replay_reproduces_balances() {
    let engine = shared_engine();
    let a = engine.open_account(Uuid::now_v7(), AccountType::Checking, usd()).await.unwrap();
    let b = engine.open_account(Uuid::now_v7(), AccountType::Checking, usd()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = engine.clone();
        let (a_id, b_id, actor) = (a.id, b.id, a.owner_id);
        handles.push(tokio::spawn(async move {
            let _ = engine
                .deposit(DepositRequest {
                    account: if i % 2 == 0 { a_id } else { b_id },
                    amount: format!("{}.00", i + 1),
                    description: None,
                    actor,
                    idempotency_key: None,
                })
                .await;
            let _ = engine
                .transfer(TransferRequest {
                    from: if i % 2 == 0 { a_id } else { b_id },
                    to: if i % 2 == 0 { b_id } else { a_id },
                    amount: "0.50".to_string(),
                    description: None,
                    actor,
                    idempotency_key: None,
                })
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Fold every entry's signed effect from zero
    let entries = engine.log().list_all().await.unwrap();
    for account in [a.id, b.id] {
        let replayed: i64 = entries.iter().map(|e| e.signed_delta(account)).sum();
        assert_eq!(replayed, balance_minor(&engine, account).await);
    }
}

/// Log whose appends take long enough that concurrent submissions overlap
struct SlowLog {
    inner: MemoryTransactionLog,
}

#[async_trait::async_trait]
impl TransactionLog for SlowLog {
    async fn append(&self, entry: LedgerEntry) -> tally_txlog::Result<LedgerEntry> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.inner.append(entry).await
    }

    async fn get(&self, id: TransactionId) -> tally_txlog::Result<Option<LedgerEntry>> {
        self.inner.get(id).await
    }

    async fn list_for_account(
        &self,
        account: Uuid,
        filter: EntryFilter,
        page: Page,
    ) -> tally_txlog::Result<Vec<LedgerEntry>> {
        self.inner.list_for_account(account, filter, page).await
    }

    async fn list_all(&self) -> tally_txlog::Result<Vec<LedgerEntry>> {
        self.inner.list_all().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_same_key_applies_once() {
    let engine = Arc::new(LedgerEngine::new(
        Arc::new(MemoryAccountStore::new()),
        Arc::new(SlowLog {
            inner: MemoryTransactionLog::new(),
        }),
        LedgerConfig {
            lock_timeout: Duration::from_secs(5),
            ..LedgerConfig::test()
        },
    ));
    let account = engine
        .open_account(Uuid::now_v7(), AccountType::Checking, usd())
        .await
        .unwrap();

    // Two simultaneous submissions sharing one idempotency key: only one
    // may execute; the other gets the same receipt back
    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        let id = account.id;
        let actor = account.owner_id;
        handles.push(tokio::spawn(async move {
            engine
                .deposit(DepositRequest {
                    account: id,
                    amount: "50.00".to_string(),
                    description: None,
                    actor,
                    idempotency_key: Some("dep-1".to_string()),
                })
                .await
        }));
    }

    let mut receipts = Vec::new();
    for handle in handles {
        receipts.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(receipts[0].transaction_id, receipts[1].transaction_id);
    assert_eq!(
        receipts.iter().filter(|r| !r.replayed).count(),
        1,
        "exactly one submission may execute"
    );
    assert_eq!(balance_minor(&engine, account.id).await, 5_000);
    assert_eq!(engine.log().list_all().await.unwrap().len(), 1);
}
