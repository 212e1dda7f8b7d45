//! Engine configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration load errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable present but unparsable
    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Ledger engine configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How long a caller waits for an account row lock before the operation
    /// fails with `LockTimeout`
    pub lock_timeout: Duration,

    /// How long a completed receipt stays replayable under its idempotency
    /// key
    pub idempotency_ttl: Duration,

    /// Descriptions longer than this are truncated
    pub max_description_len: usize,
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let lock_timeout = Duration::from_millis(Self::load_u64("TALLY_LOCK_TIMEOUT_MS", 5_000)?);
        let idempotency_ttl =
            Duration::from_secs(Self::load_u64("TALLY_IDEMPOTENCY_TTL_SECS", 86_400)?);
        let max_description_len =
            Self::load_u64("TALLY_MAX_DESCRIPTION_LEN", 500)? as usize;

        Ok(Self {
            lock_timeout,
            idempotency_ttl,
            max_description_len,
        })
    }

    /// Create test configuration with a short lock timeout.
    pub fn test() -> Self {
        Self {
            lock_timeout: Duration::from_millis(200),
            idempotency_ttl: Duration::from_secs(60),
            max_description_len: 500,
        }
    }

    fn load_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5_000),
            idempotency_ttl: Duration::from_secs(86_400),
            max_description_len: 500,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.lock_timeout, Duration::from_millis(5_000));
        assert_eq!(config.idempotency_ttl, Duration::from_secs(86_400));
        assert_eq!(config.max_description_len, 500);
    }

    #[test]
    fn test_test_config() {
        let config = LedgerConfig::test();
        assert_eq!(config.lock_timeout, Duration::from_millis(200));
    }
}
