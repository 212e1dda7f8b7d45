//! Test helpers for Tally ledger tests.
//!
//! Provides engine wiring over the in-memory store and log, account seeding,
//! and tracing initialization for tests.

mod helpers;

pub use helpers::{TestLedger, seed_account, seed_funded_account};

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize tracing for tests, honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
