//! Storage layer errors

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity (account)
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Duplicate entity (unique key violation)
    #[error("Duplicate entity: {entity_type} with id {id}")]
    Duplicate {
        /// Type of entity
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Lock acquisition exceeded the caller's timeout
    #[error("Lock timeout on account {account} after {waited_ms}ms")]
    LockTimeout {
        /// Account whose row lock could not be acquired
        account: Uuid,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] tally_domain::DomainError),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}
