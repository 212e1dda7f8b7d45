//! Transaction log types

use chrono::{DateTime, Utc};
use tally_domain::{EntryKind, TransactionId};

/// Filters for reading an account's history
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Restrict to one movement kind
    pub kind: Option<EntryKind>,

    /// Start time (inclusive), against `processed_at`
    pub from_time: Option<DateTime<Utc>>,

    /// End time (exclusive), against `processed_at`
    pub to_time: Option<DateTime<Utc>>,
}

impl EntryFilter {
    /// No filtering
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to one kind
    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to a processed-at time range
    pub fn time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from_time = Some(from);
        self.to_time = Some(to);
        self
    }
}

/// Restartable offset pagination
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// Entries to skip
    pub offset: usize,
    /// Maximum entries to return
    pub limit: usize,
}

impl Page {
    /// First page with the given size
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// The page following this one
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

/// Transaction log errors
#[derive(Debug, thiserror::Error)]
pub enum TxLogError {
    /// Entry id already appended
    #[error("Duplicate entry: {0}")]
    Duplicate(TransactionId),

    /// Storage failure; the append did not take effect, or its outcome is
    /// unknown to the caller
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for log operations
pub type Result<T> = std::result::Result<T, TxLogError>;
