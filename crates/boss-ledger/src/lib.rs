//! # boss-ledger: per-encounter damage accounting.
//!
//! - **Damage ledger**: one [`DamageLedger`] per boss instance accumulates
//!   damage, hit counts and last-hit timestamps per participant. Concurrent
//!   `record` calls merge atomically per participant; the running totals are
//!   updated lock-free.
//! - **Registry**: [`LedgerRegistry`] shards ledgers by boss id so different
//!   encounters never contend on the same ledger.

mod atomic;
pub mod ledger;
pub mod registry;

pub use ledger::{DamageLedger, LedgerSnapshot, ParticipantStats};
pub use registry::LedgerRegistry;
