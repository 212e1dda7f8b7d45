//! Money value objects.
//!
//! Immutable, validated monetary primitives.
//! Amounts are held as integer minor units (e.g. cents); decimal strings are
//! parsed exactly at the boundary and never pass through floating point.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Domain errors for value object and entity validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Amount is malformed, negative, or has too many fractional digits
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is not a 3-letter alphabetic code
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Account type outside the allowed set
    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    /// Arithmetic or comparison across different currencies
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Currency of the left-hand operand
        expected: String,
        /// Currency of the right-hand operand
        actual: String,
    },

    /// Debit would drive a balance below zero
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance available before the debit
        available: String,
        /// Amount the debit requested
        requested: String,
    },

    /// Transfer where source and destination are the same account
    #[error("Source and destination accounts must differ")]
    SameAccount,

    /// Movement against a deactivated account
    #[error("Account is inactive: {0}")]
    AccountInactive(Uuid),

    /// Ledger entry with an invalid shape
    #[error("Invalid ledger entry: {0}")]
    InvalidEntry(String),
}

// =============================================================================
// Currency
// =============================================================================

/// ISO-style 3-letter currency code
///
/// # Invariants
/// - Exactly 3 ASCII alphabetic characters, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new Currency with validation
    ///
    /// Input is uppercased, so `"usd"` and `"USD"` are the same currency.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCurrency` unless the code is exactly
    /// 3 ASCII letters
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::InvalidCurrency(format!(
                "expected 3-letter code, got {:?}",
                code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Get the currency code (always uppercase)
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of fractional decimal digits in this currency's minor unit
    ///
    /// 2 for most currencies, 0 for JPY/KRW/VND, 3 for BHD/KWD/OMR.
    pub fn minor_unit_exponent(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" => 0,
            "BHD" | "KWD" | "OMR" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// =============================================================================
// Money
// =============================================================================

/// Money represents a non-negative amount in a single currency
///
/// The magnitude is an integer count of minor units (cents for USD).
/// All arithmetic is exact integer arithmetic; decimal strings are only
/// parsed and formatted at the boundary.
///
/// # Invariants
/// - `minor_units >= 0` (balances are never negative, amounts never carry sign)
/// - Arithmetic between two Money values requires matching currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    /// Create a zero amount in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self { minor_units: 0, currency }
    }

    /// Create Money from a raw minor-unit count
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` if `minor_units` is negative
    pub fn from_minor_units(minor_units: i64, currency: Currency) -> Result<Self, DomainError> {
        if minor_units < 0 {
            return Err(DomainError::InvalidAmount(
                "amount cannot be negative".to_string(),
            ));
        }
        Ok(Self { minor_units, currency })
    }

    /// Parse an exact decimal string (e.g. `"123.45"`) into Money
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` if the input is malformed,
    /// negative, out of range, or carries more fractional digits than the
    /// currency's minor unit allows
    ///
    /// # Examples
    /// ```
    /// # use tally_domain::money::{Currency, Money};
    /// let usd = Currency::new("USD").unwrap();
    /// let m = Money::parse("123.45", usd.clone()).unwrap();
    /// assert_eq!(m.minor_units(), 12345);
    /// assert!(Money::parse("1.999", usd).is_err()); // sub-cent input rejected
    /// ```
    pub fn parse(input: &str, currency: Currency) -> Result<Self, DomainError> {
        let value = Decimal::from_str(input.trim())
            .map_err(|_| DomainError::InvalidAmount(format!("malformed amount: {:?}", input)))?;

        if value < Decimal::ZERO {
            return Err(DomainError::InvalidAmount(
                "amount cannot be negative".to_string(),
            ));
        }

        let exponent = currency.minor_unit_exponent();
        let factor = Decimal::from(10i64.pow(exponent));
        let scaled = value
            .checked_mul(factor)
            .ok_or_else(|| DomainError::InvalidAmount("amount out of range".to_string()))?;

        if scaled.fract() != Decimal::ZERO {
            return Err(DomainError::InvalidAmount(format!(
                "more than {} fractional digits for {}",
                exponent, currency
            )));
        }

        let minor_units = scaled
            .trunc()
            .to_i64()
            .ok_or_else(|| DomainError::InvalidAmount("amount out of range".to_string()))?;

        Ok(Self { minor_units, currency })
    }

    /// Parse a decimal string that must be strictly positive
    ///
    /// Used for operation amounts: deposits, withdrawals and transfers of
    /// zero are rejected.
    ///
    /// # Errors
    /// Everything `parse` rejects, plus `DomainError::InvalidAmount` on zero
    pub fn parse_positive(input: &str, currency: Currency) -> Result<Self, DomainError> {
        let money = Self::parse(input, currency)?;
        if !money.is_positive() {
            return Err(DomainError::InvalidAmount(
                "amount must be positive".to_string(),
            ));
        }
        Ok(money)
    }

    /// Get the minor-unit magnitude
    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    /// Get the currency
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// True if the amount is strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    /// True if the amount is exactly zero
    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    /// Exact addition
    ///
    /// # Errors
    /// - `DomainError::CurrencyMismatch` across currencies
    /// - `DomainError::InvalidAmount` on i64 overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, DomainError> {
        self.require_same_currency(other)?;
        let minor_units = self
            .minor_units
            .checked_add(other.minor_units)
            .ok_or_else(|| DomainError::InvalidAmount("amount out of range".to_string()))?;
        Ok(Self { minor_units, currency: self.currency.clone() })
    }

    /// Exact subtraction that never goes negative
    ///
    /// # Errors
    /// - `DomainError::CurrencyMismatch` across currencies
    /// - `DomainError::InsufficientFunds` if `other` exceeds `self`
    pub fn checked_sub(&self, other: &Money) -> Result<Money, DomainError> {
        self.require_same_currency(other)?;
        if other.minor_units > self.minor_units {
            return Err(DomainError::InsufficientFunds {
                available: self.to_string(),
                requested: other.to_string(),
            });
        }
        Ok(Self {
            minor_units: self.minor_units - other.minor_units,
            currency: self.currency.clone(),
        })
    }

    /// Compare two amounts of the same currency
    ///
    /// # Errors
    /// Returns `DomainError::CurrencyMismatch` across currencies
    pub fn compare(&self, other: &Money) -> Result<Ordering, DomainError> {
        self.require_same_currency(other)?;
        Ok(self.minor_units.cmp(&other.minor_units))
    }

    /// Format the magnitude as an exact decimal string without the currency
    /// code (e.g. `"123.45"`)
    pub fn to_decimal_string(&self) -> String {
        let exponent = self.currency.minor_unit_exponent();
        if exponent == 0 {
            return self.minor_units.to_string();
        }
        let base = 10i64.pow(exponent);
        format!(
            "{}.{:0width$}",
            self.minor_units / base,
            self.minor_units % base,
            width = exponent as usize
        )
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                actual: other.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency)
    }
}

// =============================================================================
// Tests
// =============================================================================
