//! In-memory transaction log.
//!
//! Entries are held in append order behind an `RwLock`; per-account reads
//! walk the log backwards so "newest first" falls out of append order.

use crate::log::TransactionLog;
use crate::types::{EntryFilter, Page, Result, TxLogError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use tally_domain::{AccountId, LedgerEntry, TransactionId};
use tracing::debug;

/// In-memory append-only log
pub struct MemoryTransactionLog {
    entries: RwLock<Vec<LedgerEntry>>,
    ids: RwLock<HashSet<TransactionId>>,
}

impl MemoryTransactionLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            ids: RwLock::new(HashSet::new()),
        }
    }

    /// Number of entries appended so far
    pub fn entry_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    fn matches(entry: &LedgerEntry, account: AccountId, filter: &EntryFilter) -> bool {
        if !entry.touches(account) {
            return false;
        }
        if let Some(kind) = filter.kind {
            if entry.kind != kind {
                return false;
            }
        }
        if let Some(from) = filter.from_time {
            if entry.processed_at < from {
                return false;
            }
        }
        if let Some(to) = filter.to_time {
            if entry.processed_at >= to {
                return false;
            }
        }
        true
    }
}

impl Default for MemoryTransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry> {
        {
            let mut ids = self.ids.write().unwrap();
            if !ids.insert(entry.id) {
                return Err(TxLogError::Duplicate(entry.id));
            }
        }
        self.entries.write().unwrap().push(entry.clone());
        debug!(entry = %entry.id, kind = %entry.kind, "ledger entry appended");
        Ok(entry)
    }

    async fn get(&self, id: TransactionId) -> Result<Option<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn list_for_account(
        &self,
        account: AccountId,
        filter: EntryFilter,
        page: Page,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .rev()
            .filter(|e| Self::matches(e, account, &filter))
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries.read().unwrap().clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_domain::{Currency, EntryKind, Money};
    use uuid::Uuid;

    fn usd_amount(s: &str) -> Money {
        Money::parse_positive(s, Currency::new("USD").unwrap()).unwrap()
    }

    fn deposit_entry(account: AccountId, amount: &str) -> LedgerEntry {
        LedgerEntry::deposit(account, usd_amount(amount), "Deposit", Uuid::now_v7()).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let log = MemoryTransactionLog::new();
        let account = Uuid::now_v7();

        let entry = log.append(deposit_entry(account, "1.00")).await.unwrap();
        assert_eq!(log.entry_count(), 1);

        let found = log.get(entry.id).await.unwrap().unwrap();
        assert_eq!(found.id, entry.id);
        assert!(log.get(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_rejects_duplicate_id() {
        let log = MemoryTransactionLog::new();
        let entry = deposit_entry(Uuid::now_v7(), "1.00");

        log.append(entry.clone()).await.unwrap();
        let err = log.append(entry).await.unwrap_err();
        assert!(matches!(err, TxLogError::Duplicate(_)));
        assert_eq!(log.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let log = MemoryTransactionLog::new();
        let account = Uuid::now_v7();

        let first = log.append(deposit_entry(account, "1.00")).await.unwrap();
        let second = log.append(deposit_entry(account, "2.00")).await.unwrap();

        let listed = log
            .list_for_account(account, EntryFilter::any(), Page::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_list_only_touching_entries() {
        let log = MemoryTransactionLog::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        log.append(deposit_entry(a, "1.00")).await.unwrap();
        log.append(deposit_entry(b, "2.00")).await.unwrap();
        log.append(
            LedgerEntry::transfer(a, b, usd_amount("0.50"), "Transfer", Uuid::now_v7()).unwrap(),
        )
        .await
        .unwrap();

        let for_a = log
            .list_for_account(a, EntryFilter::any(), Page::default())
            .await
            .unwrap();
        assert_eq!(for_a.len(), 2); // own deposit + the transfer

        let for_b = log
            .list_for_account(b, EntryFilter::any(), Page::default())
            .await
            .unwrap();
        assert_eq!(for_b.len(), 2);
    }

    #[tokio::test]
    async fn test_kind_filter() {
        let log = MemoryTransactionLog::new();
        let account = Uuid::now_v7();

        log.append(deposit_entry(account, "5.00")).await.unwrap();
        log.append(
            LedgerEntry::withdrawal(account, usd_amount("1.00"), "Withdrawal", Uuid::now_v7())
                .unwrap(),
        )
        .await
        .unwrap();

        let withdrawals = log
            .list_for_account(
                account,
                EntryFilter::any().kind(EntryKind::Withdrawal),
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].kind, EntryKind::Withdrawal);
    }

    #[tokio::test]
    async fn test_time_range_filter_boundaries() {
        let log = MemoryTransactionLog::new();
        let account = Uuid::now_v7();
        let base = chrono::Utc::now();

        let mut early = deposit_entry(account, "1.00");
        early.processed_at = base;
        let mut middle = deposit_entry(account, "2.00");
        middle.processed_at = base + chrono::Duration::seconds(10);
        let mut late = deposit_entry(account, "3.00");
        late.processed_at = base + chrono::Duration::seconds(20);

        log.append(early.clone()).await.unwrap();
        log.append(middle.clone()).await.unwrap();
        log.append(late.clone()).await.unwrap();

        // From is inclusive, to is exclusive: an entry exactly at the start
        // is kept, an entry exactly at the end is not
        let ranged = log
            .list_for_account(
                account,
                EntryFilter::any().time_range(middle.processed_at, late.processed_at),
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].id, middle.id);

        let all = log
            .list_for_account(
                account,
                EntryFilter::any().time_range(base, base + chrono::Duration::seconds(30)),
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_pagination_restartable() {
        let log = MemoryTransactionLog::new();
        let account = Uuid::now_v7();
        for i in 1..=5 {
            log.append(deposit_entry(account, &format!("{}.00", i)))
                .await
                .unwrap();
        }

        let page = Page::first(2);
        let p1 = log
            .list_for_account(account, EntryFilter::any(), page)
            .await
            .unwrap();
        let p2 = log
            .list_for_account(account, EntryFilter::any(), page.next())
            .await
            .unwrap();
        let p3 = log
            .list_for_account(account, EntryFilter::any(), page.next().next())
            .await
            .unwrap();

        assert_eq!(p1.len(), 2);
        assert_eq!(p2.len(), 2);
        assert_eq!(p3.len(), 1);

        // No overlap between pages
        let mut seen = std::collections::HashSet::new();
        for entry in p1.iter().chain(&p2).chain(&p3) {
            assert!(seen.insert(entry.id));
        }
    }
}
