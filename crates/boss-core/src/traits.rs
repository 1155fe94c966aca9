//! Collaborator interfaces injected into the engine components.
//!
//! - [`KillHistory`]: read-only kill counts per boss type (storage layer implements)
//! - [`Clock`]: millisecond wall clock ([`SystemClock`] in production,
//!   [`ManualClock`] for replays and tests)

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::HistoryError;

/// Read-only query for how many times a boss type has been killed.
///
/// Absence of an implementation is modelled by the caller as zero kills; an
/// implementation that is present but failing returns `Err`.
pub trait KillHistory: Send + Sync {
    /// Total historical kills of `boss_type`.
    fn kill_count(&self, boss_type: &str) -> Result<u32, HistoryError>;
}

impl<F> KillHistory for F
where
    F: Fn(&str) -> Result<u32, HistoryError> + Send + Sync,
{
    fn kill_count(&self, boss_type: &str) -> Result<u32, HistoryError> {
        self(boss_type)
    }
}

/// A fixed table of kill counts. Unknown boss types have zero kills.
impl KillHistory for HashMap<String, u32> {
    fn kill_count(&self, boss_type: &str) -> Result<u32, HistoryError> {
        Ok(self.get(boss_type).copied().unwrap_or(0))
    }
}

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::Release);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}
