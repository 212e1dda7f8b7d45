//! PostgreSQL transaction log (feature `postgres`).
//!
//! Single-statement appends keep the "never partially writes" contract; the
//! primary-key constraint turns replayed appends into `Duplicate` instead of
//! silent double-logging.

use crate::log::TransactionLog;
use crate::types::{EntryFilter, Page, Result, TxLogError};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tally_domain::{
    AccountId, Currency, EntryKind, EntryStatus, LedgerEntry, Money, TransactionId,
};
use tracing::{debug, warn};

/// Durable append-only log backed by PostgreSQL
pub struct PgTransactionLog {
    pool: PgPool,
}

impl PgTransactionLog {
    /// Wrap an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger_entries table if it does not exist
    pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id UUID PRIMARY KEY,
                kind TEXT NOT NULL,
                amount_minor BIGINT NOT NULL CHECK (amount_minor > 0),
                currency TEXT NOT NULL,
                source UUID,
                destination UUID,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                initiated_by UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                processed_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ledger_entries_source_idx
                ON ledger_entries (source, processed_at DESC);
            CREATE INDEX IF NOT EXISTS ledger_entries_destination_idx
                ON ledger_entries (destination, processed_at DESC);
            "#,
        )
        .execute(pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    fn entry_from_row(row: &sqlx::postgres::PgRow) -> Result<LedgerEntry> {
        let currency_code: String = row.try_get("currency").map_err(storage_err)?;
        let currency = Currency::new(&currency_code)
            .map_err(|e| TxLogError::Storage(format!("corrupt currency column: {}", e)))?;
        let amount_minor: i64 = row.try_get("amount_minor").map_err(storage_err)?;
        let amount = Money::from_minor_units(amount_minor, currency)
            .map_err(|e| TxLogError::Storage(format!("corrupt amount column: {}", e)))?;

        let kind: String = row.try_get("kind").map_err(storage_err)?;
        let status: String = row.try_get("status").map_err(storage_err)?;

        Ok(LedgerEntry {
            id: row.try_get("id").map_err(storage_err)?,
            kind: parse_kind(&kind)?,
            amount,
            source: row.try_get("source").map_err(storage_err)?,
            destination: row.try_get("destination").map_err(storage_err)?,
            description: row.try_get("description").map_err(storage_err)?,
            status: parse_status(&status)?,
            initiated_by: row.try_get("initiated_by").map_err(storage_err)?,
            created_at: row.try_get("created_at").map_err(storage_err)?,
            processed_at: row.try_get("processed_at").map_err(storage_err)?,
        })
    }
}

#[async_trait]
impl TransactionLog for PgTransactionLog {
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, kind, amount_minor, currency, source, destination,
                description, status, initiated_by, created_at, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.kind.as_str())
        .bind(entry.amount.minor_units())
        .bind(entry.amount.currency().code())
        .bind(entry.source)
        .bind(entry.destination)
        .bind(&entry.description)
        .bind(entry.status.as_str())
        .bind(entry.initiated_by)
        .bind(entry.created_at)
        .bind(entry.processed_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(entry = %entry.id, kind = %entry.kind, "ledger entry appended");
                Ok(entry)
            }
            Err(sqlx::Error::Database(db_err)) if is_unique_violation(db_err.as_ref()) => {
                warn!(entry = %entry.id, "duplicate ledger entry append detected");
                Err(TxLogError::Duplicate(entry.id))
            }
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn get(&self, id: TransactionId) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query("SELECT * FROM ledger_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.as_ref().map(Self::entry_from_row).transpose()
    }

    async fn list_for_account(
        &self,
        account: AccountId,
        filter: EntryFilter,
        page: Page,
    ) -> Result<Vec<LedgerEntry>> {
        let mut sql =
            String::from("SELECT * FROM ledger_entries WHERE (source = $1 OR destination = $1)");
        let mut bind_count = 1;

        if filter.kind.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND kind = ${}", bind_count));
        }
        if filter.from_time.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND processed_at >= ${}", bind_count));
        }
        if filter.to_time.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND processed_at < ${}", bind_count));
        }
        sql.push_str(&format!(
            " ORDER BY processed_at DESC, id DESC OFFSET ${} LIMIT ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut query = sqlx::query(&sql).bind(account);
        if let Some(kind) = filter.kind {
            query = query.bind(kind.as_str());
        }
        if let Some(from) = filter.from_time {
            query = query.bind(from);
        }
        if let Some(to) = filter.to_time {
            query = query.bind(to);
        }
        query = query.bind(page.offset as i64).bind(page.limit as i64);

        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        rows.iter().map(Self::entry_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query("SELECT * FROM ledger_entries ORDER BY processed_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(Self::entry_from_row).collect()
    }
}

fn storage_err(err: sqlx::Error) -> TxLogError {
    TxLogError::Storage(err.to_string())
}

/// Check if database error is a unique constraint violation
fn is_unique_violation(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err.code() == Some(std::borrow::Cow::Borrowed("23505"))
}

fn parse_kind(s: &str) -> Result<EntryKind> {
    match s {
        "deposit" => Ok(EntryKind::Deposit),
        "withdrawal" => Ok(EntryKind::Withdrawal),
        "transfer" => Ok(EntryKind::Transfer),
        other => Err(TxLogError::Storage(format!("unknown entry kind: {}", other))),
    }
}

fn parse_status(s: &str) -> Result<EntryStatus> {
    match s {
        "completed" => Ok(EntryStatus::Completed),
        "failed" => Ok(EntryStatus::Failed),
        other => Err(TxLogError::Storage(format!("unknown entry status: {}", other))),
    }
}
