//! The ledger engine.
//!
//! Each public operation is one atomic unit: validate, lock the touched
//! account rows, apply the balance deltas, append exactly one log entry.
//! Locks are always taken in ascending account-id order, so two concurrent
//! operations can never hold each other's rows.
//!
//! Keyed requests claim their idempotency key before executing; concurrent
//! submissions of the same key resolve to a single execution, with the
//! losers receiving the winner's receipt.
//!
//! Rejected operations return before any mutation and are never logged;
//! the only mid-unit failure point is the log append, which rolls the
//! in-memory balances back under the still-held locks before surfacing
//! `Persistence`.

use crate::config::LedgerConfig;
use crate::contract::{
    AccountBalance, DepositRequest, Receipt, TransferRequest, WithdrawRequest,
};
use crate::error::LedgerError;
use crate::idempotency::{request_fingerprint, IdempotencyCache};
use std::sync::Arc;
use tally_domain::{
    Account, AccountId, AccountType, ActorId, Currency, LedgerEntry, Money, OwnerId,
};
use tally_store::{AccountGuard, AccountRepository, MemoryAccountStore};
use tally_txlog::TransactionLog;
use tracing::{debug, info, warn};

/// Atomic funds-movement engine over an account store and a transaction log
pub struct LedgerEngine {
    store: Arc<MemoryAccountStore>,
    log: Arc<dyn TransactionLog>,
    idempotency: IdempotencyCache,
    config: LedgerConfig,
}

impl LedgerEngine {
    /// Create an engine over the given store and log
    pub fn new(
        store: Arc<MemoryAccountStore>,
        log: Arc<dyn TransactionLog>,
        config: LedgerConfig,
    ) -> Self {
        let idempotency = IdempotencyCache::new(config.idempotency_ttl);
        Self {
            store,
            log,
            idempotency,
            config,
        }
    }

    /// The account store this engine writes through
    pub fn store(&self) -> &Arc<MemoryAccountStore> {
        &self.store
    }

    /// The transaction log this engine appends to
    pub fn log(&self) -> &Arc<dyn TransactionLog> {
        &self.log
    }

    // =========================================================================
    // Account lifecycle
    // =========================================================================

    /// Open a new active account with a zero balance
    pub async fn open_account(
        &self,
        owner: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<Account, LedgerError> {
        let account = self.store.create(owner, account_type, currency).await?;
        info!(
            account = %account.id,
            owner = %owner,
            account_type = %account_type,
            "account opened"
        );
        Ok(account)
    }

    /// Deactivate an account; idempotent
    ///
    /// The account keeps its balance and history but rejects all further
    /// movement.
    pub async fn deactivate_account(
        &self,
        actor: ActorId,
        id: AccountId,
    ) -> Result<Account, LedgerError> {
        let mut guard = self.store.lock_for_update(id, self.config.lock_timeout).await?;
        guard.deactivate();
        info!(account = %id, actor = %actor, "account deactivated");
        Ok(guard.clone())
    }

    // =========================================================================
    // Movements
    // =========================================================================

    /// Credit external funds into one account
    pub async fn deposit(&self, req: DepositRequest) -> Result<Receipt, LedgerError> {
        let key = req.idempotency_key.clone();
        let fingerprint = key.as_deref().map(|_| {
            request_fingerprint(
                "deposit",
                &[req.account],
                &req.amount,
                req.description.as_deref(),
            )
        });
        if let Some(receipt) = self.claim(key.as_deref(), fingerprint.as_deref()).await? {
            return Ok(receipt);
        }

        let result = self.deposit_unit(req).await;
        self.settle(key.as_deref(), fingerprint.as_deref(), &result);
        result
    }

    /// Debit funds out of one account
    pub async fn withdraw(&self, req: WithdrawRequest) -> Result<Receipt, LedgerError> {
        let key = req.idempotency_key.clone();
        let fingerprint = key.as_deref().map(|_| {
            request_fingerprint(
                "withdrawal",
                &[req.account],
                &req.amount,
                req.description.as_deref(),
            )
        });
        if let Some(receipt) = self.claim(key.as_deref(), fingerprint.as_deref()).await? {
            return Ok(receipt);
        }

        let result = self.withdraw_unit(req).await;
        self.settle(key.as_deref(), fingerprint.as_deref(), &result);
        result
    }

    /// Move funds between two accounts atomically
    ///
    /// Both balance changes and the single transfer entry happen as one
    /// unit: either the source is debited, the destination is credited, and
    /// the entry is recorded, or nothing changes at all.
    pub async fn transfer(&self, req: TransferRequest) -> Result<Receipt, LedgerError> {
        if req.from == req.to {
            return Err(LedgerError::SameAccount);
        }

        let key = req.idempotency_key.clone();
        let fingerprint = key.as_deref().map(|_| {
            request_fingerprint(
                "transfer",
                &[req.from, req.to],
                &req.amount,
                req.description.as_deref(),
            )
        });
        if let Some(receipt) = self.claim(key.as_deref(), fingerprint.as_deref()).await? {
            return Ok(receipt);
        }

        let result = self.transfer_unit(req).await;
        self.settle(key.as_deref(), fingerprint.as_deref(), &result);
        result
    }

    // =========================================================================
    // Atomic units
    // =========================================================================

    async fn deposit_unit(&self, req: DepositRequest) -> Result<Receipt, LedgerError> {
        debug!(account = %req.account, amount = %req.amount, "deposit requested");
        let currency = self.account_currency(req.account).await?;
        let amount = Money::parse_positive(&req.amount, currency)?;
        let description = self.clean_description(req.description, "Deposit");

        let mut guard = self
            .store
            .lock_for_update(req.account, self.config.lock_timeout)
            .await?;

        let prior = guard.clone();
        guard.credit(&amount)?;

        let entry = LedgerEntry::deposit(req.account, amount, description, req.actor)?;
        let entry = match self.log.append(entry).await {
            Ok(entry) => entry,
            Err(err) => {
                *guard = prior;
                warn!(account = %req.account, error = %err, "deposit append failed, balance restored");
                return Err(err.into());
            }
        };

        info!(
            transaction = %entry.id,
            account = %req.account,
            amount = %entry.amount,
            "deposit completed"
        );
        Ok(Receipt {
            transaction_id: entry.id,
            balances: vec![balance_of(&guard)],
            replayed: false,
        })
    }

    async fn withdraw_unit(&self, req: WithdrawRequest) -> Result<Receipt, LedgerError> {
        debug!(account = %req.account, amount = %req.amount, "withdrawal requested");
        let currency = self.account_currency(req.account).await?;
        let amount = Money::parse_positive(&req.amount, currency)?;
        let description = self.clean_description(req.description, "Withdrawal");

        let mut guard = self
            .store
            .lock_for_update(req.account, self.config.lock_timeout)
            .await?;

        let prior = guard.clone();
        guard.debit(&amount)?;

        let entry = LedgerEntry::withdrawal(req.account, amount, description, req.actor)?;
        let entry = match self.log.append(entry).await {
            Ok(entry) => entry,
            Err(err) => {
                *guard = prior;
                warn!(account = %req.account, error = %err, "withdrawal append failed, balance restored");
                return Err(err.into());
            }
        };

        info!(
            transaction = %entry.id,
            account = %req.account,
            amount = %entry.amount,
            "withdrawal completed"
        );
        Ok(Receipt {
            transaction_id: entry.id,
            balances: vec![balance_of(&guard)],
            replayed: false,
        })
    }

    async fn transfer_unit(&self, req: TransferRequest) -> Result<Receipt, LedgerError> {
        debug!(from = %req.from, to = %req.to, amount = %req.amount, "transfer requested");
        let from_currency = self.account_currency(req.from).await?;
        let to_currency = self.account_currency(req.to).await?;
        if from_currency != to_currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: from_currency.code().to_string(),
                actual: to_currency.code().to_string(),
            });
        }
        let amount = Money::parse_positive(&req.amount, from_currency)?;
        let description = self.clean_description(req.description, "Transfer");

        // Lock in ascending id order regardless of transfer direction
        let (mut from_guard, mut to_guard) = if req.from < req.to {
            let first = self
                .store
                .lock_for_update(req.from, self.config.lock_timeout)
                .await?;
            let second = self
                .store
                .lock_for_update(req.to, self.config.lock_timeout)
                .await?;
            (first, second)
        } else {
            let first = self
                .store
                .lock_for_update(req.to, self.config.lock_timeout)
                .await?;
            let second = self
                .store
                .lock_for_update(req.from, self.config.lock_timeout)
                .await?;
            (second, first)
        };

        // Validate both sides before mutating either
        if !from_guard.is_active {
            return Err(LedgerError::AccountInactive(req.from));
        }
        if !to_guard.is_active {
            return Err(LedgerError::AccountInactive(req.to));
        }

        let from_prior = from_guard.clone();
        let to_prior = to_guard.clone();

        from_guard.debit(&amount)?;
        if let Err(err) = to_guard.credit(&amount) {
            *from_guard = from_prior;
            return Err(err.into());
        }

        let entry = LedgerEntry::transfer(req.from, req.to, amount, description, req.actor)?;
        let entry = match self.log.append(entry).await {
            Ok(entry) => entry,
            Err(err) => {
                *from_guard = from_prior;
                *to_guard = to_prior;
                warn!(from = %req.from, to = %req.to, error = %err, "transfer append failed, balances restored");
                return Err(err.into());
            }
        };

        info!(
            transaction = %entry.id,
            from = %req.from,
            to = %req.to,
            amount = %entry.amount,
            "transfer completed"
        );
        Ok(Receipt {
            transaction_id: entry.id,
            balances: vec![balance_of(&from_guard), balance_of(&to_guard)],
            replayed: false,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Unlocked currency lookup; the locked credit/debit re-validates
    async fn account_currency(&self, id: AccountId) -> Result<Currency, LedgerError> {
        let account = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))?;
        Ok(account.currency().clone())
    }

    fn clean_description(&self, description: Option<String>, default: &str) -> String {
        let description = match description {
            Some(d) if !d.trim().is_empty() => d,
            _ => return default.to_string(),
        };
        if description.chars().count() > self.config.max_description_len {
            description
                .chars()
                .take(self.config.max_description_len)
                .collect()
        } else {
            description
        }
    }

    async fn claim(
        &self,
        key: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<Option<Receipt>, LedgerError> {
        match (key, fingerprint) {
            (Some(key), Some(fingerprint)) => self.idempotency.claim(key, fingerprint).await,
            _ => Ok(None),
        }
    }

    fn settle(
        &self,
        key: Option<&str>,
        fingerprint: Option<&str>,
        result: &Result<Receipt, LedgerError>,
    ) {
        if let (Some(key), Some(fingerprint)) = (key, fingerprint) {
            match result {
                Ok(receipt) => self.idempotency.complete(key, fingerprint, receipt),
                Err(_) => self.idempotency.abort(key),
            }
        }
    }
}

fn balance_of(guard: &AccountGuard) -> AccountBalance {
    AccountBalance {
        account: guard.id,
        balance: guard.balance.clone(),
    }
}
