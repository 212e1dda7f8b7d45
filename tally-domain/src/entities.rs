//! Domain entities.
//!
//! Accounts and immutable ledger entries, with their lifecycle rules.
//! Balance changes go through `credit`/`debit` only, which enforce the
//! non-negative balance and matching-currency invariants.

use crate::money::{Currency, DomainError, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for an Account
pub type AccountId = Uuid;

/// Unique identifier for a ledger entry (transaction)
pub type TransactionId = Uuid;

/// Unique identifier for the owner of an account
pub type OwnerId = Uuid;

/// Unique identifier for the actor initiating an operation
pub type ActorId = Uuid;

// =============================================================================
// Account
// =============================================================================

/// Category of account, fixed at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Savings account
    Savings,
    /// Checking account
    Checking,
    /// Business account
    Business,
}

impl AccountType {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Checking => "checking",
            AccountType::Business => "business",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "savings" => Ok(AccountType::Savings),
            "checking" => Ok(AccountType::Checking),
            "business" => Ok(AccountType::Business),
            other => Err(DomainError::InvalidAccountType(other.to_string())),
        }
    }
}

/// A monetary account
///
/// Key rules:
/// - `balance` is never negative
/// - balance changes only through `credit`/`debit`
/// - accounts are deactivated, never deleted; a deactivated account rejects
///   all movement but retains its history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable surrogate key
    pub id: AccountId,
    /// 12-digit public account number, unique per store
    pub account_number: String,
    /// Owning user
    pub owner_id: OwnerId,
    /// Account category, fixed at open time
    pub account_type: AccountType,
    /// Current balance, non-negative
    pub balance: Money,
    /// False once the account has been deactivated
    pub is_active: bool,

    // Audit
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,
    /// Monotonic mutation counter, used for optimistic conflict detection at
    /// the storage boundary
    pub version: i64,
}

impl Account {
    /// Open a new active account with a zero balance
    pub fn open(
        owner_id: OwnerId,
        account_number: String,
        account_type: AccountType,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            account_number,
            owner_id,
            account_type,
            balance: Money::zero(currency),
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Currency this account is denominated in
    pub fn currency(&self) -> &Currency {
        self.balance.currency()
    }

    /// Add a positive amount to the balance
    ///
    /// # Errors
    /// - `DomainError::AccountInactive` if the account is deactivated
    /// - `DomainError::InvalidAmount` if the amount is not positive
    /// - `DomainError::CurrencyMismatch` if currencies differ
    pub fn credit(&mut self, amount: &Money) -> Result<(), DomainError> {
        self.require_active()?;
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount(
                "credit amount must be positive".to_string(),
            ));
        }
        self.balance = self.balance.checked_add(amount)?;
        self.touch();
        Ok(())
    }

    /// Remove a positive amount from the balance
    ///
    /// Fails before any state change, so a rejected debit leaves the account
    /// untouched.
    ///
    /// # Errors
    /// - `DomainError::AccountInactive` if the account is deactivated
    /// - `DomainError::InvalidAmount` if the amount is not positive
    /// - `DomainError::CurrencyMismatch` if currencies differ
    /// - `DomainError::InsufficientFunds` if the balance would go negative
    pub fn debit(&mut self, amount: &Money) -> Result<(), DomainError> {
        self.require_active()?;
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount(
                "debit amount must be positive".to_string(),
            ));
        }
        self.balance = self.balance.checked_sub(amount)?;
        self.touch();
        Ok(())
    }

    /// Deactivate the account; idempotent
    pub fn deactivate(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.touch();
        }
    }

    /// True if the account can hold `amount` without going negative
    pub fn can_cover(&self, amount: &Money) -> Result<bool, DomainError> {
        Ok(self.balance.compare(amount)? != std::cmp::Ordering::Less)
    }

    fn require_active(&self) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::AccountInactive(self.id));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Ledger entries
// =============================================================================

/// Kind of balance movement a ledger entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Money entering the ledger from outside
    Deposit,
    /// Money leaving the ledger
    Withdrawal,
    /// Money moving between two accounts
    Transfer,
}

impl EntryKind {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final status of a ledger entry
///
/// The engine only ever appends `Completed` entries: a rejected movement
/// never mutates a balance and is not logged, so replaying the log from
/// zero reproduces every balance exactly. `Failed` exists for storage and
/// wire completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Balances reflect this entry
    Completed,
    /// Recorded rejection; never balance-affecting
    Failed,
}

impl EntryStatus {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
        }
    }
}

/// An immutable record of one completed balance movement
///
/// Shape per kind:
/// - deposit: no source, destination set
/// - withdrawal: source set, no destination
/// - transfer: both set, source != destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry id, independent of account ids
    pub id: TransactionId,
    /// Movement kind
    pub kind: EntryKind,
    /// Amount moved, strictly positive
    pub amount: Money,
    /// Debited account, if any
    pub source: Option<AccountId>,
    /// Credited account, if any
    pub destination: Option<AccountId>,
    /// Free-form caller description
    pub description: String,
    /// Entry status
    pub status: EntryStatus,
    /// Actor that initiated the movement
    pub initiated_by: ActorId,
    /// When the movement was requested
    pub created_at: DateTime<Utc>,
    /// When the movement was applied
    pub processed_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build a completed deposit entry
    ///
    /// # Errors
    /// Returns `DomainError::InvalidEntry` if the amount is not positive
    pub fn deposit(
        destination: AccountId,
        amount: Money,
        description: impl Into<String>,
        initiated_by: ActorId,
    ) -> Result<Self, DomainError> {
        Self::new(EntryKind::Deposit, amount, None, Some(destination), description, initiated_by)
    }

    /// Build a completed withdrawal entry
    ///
    /// # Errors
    /// Returns `DomainError::InvalidEntry` if the amount is not positive
    pub fn withdrawal(
        source: AccountId,
        amount: Money,
        description: impl Into<String>,
        initiated_by: ActorId,
    ) -> Result<Self, DomainError> {
        Self::new(EntryKind::Withdrawal, amount, Some(source), None, description, initiated_by)
    }

    /// Build a completed transfer entry
    ///
    /// # Errors
    /// - `DomainError::SameAccount` if source equals destination
    /// - `DomainError::InvalidEntry` if the amount is not positive
    pub fn transfer(
        source: AccountId,
        destination: AccountId,
        amount: Money,
        description: impl Into<String>,
        initiated_by: ActorId,
    ) -> Result<Self, DomainError> {
        if source == destination {
            return Err(DomainError::SameAccount);
        }
        Self::new(
            EntryKind::Transfer,
            amount,
            Some(source),
            Some(destination),
            description,
            initiated_by,
        )
    }

    fn new(
        kind: EntryKind,
        amount: Money,
        source: Option<AccountId>,
        destination: Option<AccountId>,
        description: impl Into<String>,
        initiated_by: ActorId,
    ) -> Result<Self, DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidEntry(
                "entry amount must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            kind,
            amount,
            source,
            destination,
            description: description.into(),
            status: EntryStatus::Completed,
            initiated_by,
            created_at: now,
            processed_at: now,
        })
    }

    /// True if the entry references the given account on either side
    pub fn touches(&self, account: AccountId) -> bool {
        self.source == Some(account) || self.destination == Some(account)
    }

    /// Signed minor-unit effect of this entry on one account's balance
    ///
    /// Positive when the account is the destination, negative when it is the
    /// source, zero when the entry does not touch it. Folding these from
    /// account creation reproduces the current balance.
    pub fn signed_delta(&self, account: AccountId) -> i64 {
        if self.status != EntryStatus::Completed {
            return 0;
        }
        let mut delta = 0i64;
        if self.destination == Some(account) {
            delta += self.amount.minor_units();
        }
        if self.source == Some(account) {
            delta -= self.amount.minor_units();
        }
        delta
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn usd_amount(s: &str) -> Money {
        Money::parse_positive(s, usd()).unwrap()
    }

    fn test_account() -> Account {
        Account::open(
            Uuid::now_v7(),
            "123456789012".to_string(),
            AccountType::Checking,
            usd(),
        )
    }

    // Account tests
    #[test]
    fn test_open_account_zero_balance() {
        let account = test_account();
        assert!(account.balance.is_zero());
        assert!(account.is_active);
        assert_eq!(account.version, 1);
        assert_eq!(account.currency(), &usd());
        assert_eq!(account.account_type, AccountType::Checking);
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!("savings".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert_eq!("Checking".parse::<AccountType>().unwrap(), AccountType::Checking);
        assert_eq!(AccountType::Business.as_str(), "business");
        assert!(matches!(
            "premium".parse::<AccountType>(),
            Err(DomainError::InvalidAccountType(_))
        ));
    }

    #[test]
    fn test_credit_and_debit() {
        let mut account = test_account();
        account.credit(&usd_amount("10.00")).unwrap();
        assert_eq!(account.balance.minor_units(), 1000);

        account.debit(&usd_amount("2.50")).unwrap();
        assert_eq!(account.balance.minor_units(), 750);
    }

    #[test]
    fn test_debit_insufficient_funds_leaves_balance() {
        let mut account = test_account();
        account.credit(&usd_amount("5.00")).unwrap();
        let version = account.version;

        let err = account.debit(&usd_amount("5.01")).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds { .. }));
        assert_eq!(account.balance.minor_units(), 500);
        assert_eq!(account.version, version);
    }

    #[test]
    fn test_mutation_bumps_version() {
        let mut account = test_account();
        let v0 = account.version;
        account.credit(&usd_amount("1.00")).unwrap();
        assert_eq!(account.version, v0 + 1);
        account.debit(&usd_amount("1.00")).unwrap();
        assert_eq!(account.version, v0 + 2);
    }

    #[test]
    fn test_inactive_account_rejects_movement() {
        let mut account = test_account();
        account.credit(&usd_amount("10.00")).unwrap();
        account.deactivate();
        assert!(!account.is_active);

        assert!(matches!(
            account.credit(&usd_amount("1.00")),
            Err(DomainError::AccountInactive(_))
        ));
        assert!(matches!(
            account.debit(&usd_amount("1.00")),
            Err(DomainError::AccountInactive(_))
        ));
        // History (balance) is retained
        assert_eq!(account.balance.minor_units(), 1000);
    }

    #[test]
    fn test_deactivate_idempotent() {
        let mut account = test_account();
        account.deactivate();
        let version = account.version;
        account.deactivate();
        assert_eq!(account.version, version);
    }

    #[test]
    fn test_credit_currency_mismatch() {
        let mut account = test_account();
        let yen = Money::parse_positive("100", Currency::new("JPY").unwrap()).unwrap();
        assert!(matches!(
            account.credit(&yen),
            Err(DomainError::CurrencyMismatch { .. })
        ));
    }

    // Ledger entry tests
    #[test]
    fn test_deposit_entry_shape() {
        let dest = Uuid::now_v7();
        let entry = LedgerEntry::deposit(dest, usd_amount("1.00"), "Deposit", Uuid::now_v7()).unwrap();
        assert_eq!(entry.kind, EntryKind::Deposit);
        assert_eq!(entry.source, None);
        assert_eq!(entry.destination, Some(dest));
        assert_eq!(entry.status, EntryStatus::Completed);
    }

    #[test]
    fn test_withdrawal_entry_shape() {
        let source = Uuid::now_v7();
        let entry =
            LedgerEntry::withdrawal(source, usd_amount("1.00"), "Withdrawal", Uuid::now_v7())
                .unwrap();
        assert_eq!(entry.kind, EntryKind::Withdrawal);
        assert_eq!(entry.source, Some(source));
        assert_eq!(entry.destination, None);
    }

    #[test]
    fn test_transfer_entry_rejects_same_account() {
        let account = Uuid::now_v7();
        let err = LedgerEntry::transfer(
            account,
            account,
            usd_amount("1.00"),
            "Transfer",
            Uuid::now_v7(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::SameAccount);
    }

    #[test]
    fn test_signed_delta() {
        let from = Uuid::now_v7();
        let to = Uuid::now_v7();
        let entry =
            LedgerEntry::transfer(from, to, usd_amount("3.00"), "Transfer", Uuid::now_v7())
                .unwrap();

        assert_eq!(entry.signed_delta(from), -300);
        assert_eq!(entry.signed_delta(to), 300);
        assert_eq!(entry.signed_delta(Uuid::now_v7()), 0);
        assert!(entry.touches(from));
        assert!(entry.touches(to));
    }
}
