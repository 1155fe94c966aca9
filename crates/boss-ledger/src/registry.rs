//! Ledgers for every live encounter, keyed by boss id.

use std::sync::Arc;

use boss_core::{BossId, BossTier, DamageEvent};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use crate::ledger::DamageLedger;

/// Concurrent map of boss id to its [`DamageLedger`].
///
/// Ledgers are handed out as `Arc`s so a caller can keep recording into a
/// ledger without holding a registry shard lock.
#[derive(Debug, Default)]
pub struct LedgerRegistry {
    ledgers: DashMap<BossId, Arc<DamageLedger>>,
}

impl LedgerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a ledger for `boss_id`, or return the one already open.
    pub fn open(
        &self,
        boss_id: BossId,
        boss_type: &str,
        tier: BossTier,
        now_ms: i64,
    ) -> Arc<DamageLedger> {
        match self.ledgers.entry(boss_id) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let ledger = Arc::new(DamageLedger::new(boss_id, boss_type, tier, now_ms));
                entry.insert(Arc::clone(&ledger));
                info!(boss = %boss_id, boss_type, %tier, "registry: ledger opened");
                ledger
            }
        }
    }

    pub fn get(&self, boss_id: &BossId) -> Option<Arc<DamageLedger>> {
        self.ledgers.get(boss_id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, boss_id: &BossId) -> bool {
        self.ledgers.contains_key(boss_id)
    }

    /// Route a damage event to its boss's ledger.
    ///
    /// Events for bosses without an open ledger are dropped.
    pub fn record(&self, event: &DamageEvent) -> bool {
        let Some(ledger) = self.get(&event.boss_id) else {
            warn!(boss = %event.boss_id, participant = %event.participant_id, "registry: damage for unknown boss dropped");
            return false;
        };
        ledger.record(event.participant_id, event.amount, event.timestamp_ms)
    }

    /// Mark an encounter finished. Returns the ledger if it exists.
    pub fn finish(&self, boss_id: &BossId, now_ms: i64) -> Option<Arc<DamageLedger>> {
        let ledger = self.get(boss_id)?;
        if ledger.finish(now_ms) {
            debug!(boss = %boss_id, duration_ms = ledger.duration_ms(now_ms), "registry: encounter finished");
        }
        Some(ledger)
    }

    pub fn remove(&self, boss_id: &BossId) -> Option<Arc<DamageLedger>> {
        self.ledgers.remove(boss_id).map(|(_, ledger)| ledger)
    }

    /// Drop ledgers opened more than `max_age_ms` before `now_ms`.
    ///
    /// Returns the number of ledgers removed.
    pub fn purge_expired(&self, now_ms: i64, max_age_ms: i64) -> usize {
        let before = self.ledgers.len();
        self.ledgers
            .retain(|_, ledger| now_ms.saturating_sub(ledger.started_at_ms()) <= max_age_ms);
        let removed = before.saturating_sub(self.ledgers.len());
        if removed > 0 {
            info!(removed, remaining = self.ledgers.len(), "registry: expired ledgers purged");
        }
        removed
    }

    pub fn boss_ids(&self) -> Vec<BossId> {
        self.ledgers.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}
