//! Per-encounter damage ledger.
//!
//! A [`DamageLedger`] belongs to exactly one boss instance. It records, per
//! participant, the accumulated damage, the number of hits and the timestamp
//! of the latest hit, and keeps running totals for the whole encounter.
//!
//! Writers call [`DamageLedger::record`] from any thread. The per-participant
//! merge happens under the map shard's entry lock, so two hits by the same
//! participant are never lost. The encounter totals are updated outside that
//! lock: the hit count with an atomic increment, the damage with a
//! compare-and-swap loop. Readers may therefore observe a snapshot taken
//! between the two updates; once writers quiesce,
//! `sum(damage_of) == total_damage()` and `sum(hits_of) == total_hits()`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use boss_core::{BossId, BossTier, ParticipantId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atomic::AtomicF64;

/// Sentinel for "encounter still running".
const NOT_FINISHED: i64 = i64::MIN;

/// Accumulated figures for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStats {
    pub damage: f64,
    pub hits: u64,
    /// Timestamp of the most recently recorded hit (Unix ms).
    pub last_hit_ms: i64,
}

/// Damage accounting for a single boss encounter.
#[derive(Debug)]
pub struct DamageLedger {
    boss_id: BossId,
    boss_type: String,
    tier: BossTier,
    started_at_ms: i64,
    finished_at_ms: AtomicI64,
    participants: DashMap<ParticipantId, ParticipantStats>,
    total_damage: AtomicF64,
    total_hits: AtomicU64,
}

impl DamageLedger {
    /// Open an empty ledger for `boss_id`, started at `started_at_ms`.
    pub fn new(
        boss_id: BossId,
        boss_type: impl Into<String>,
        tier: BossTier,
        started_at_ms: i64,
    ) -> Self {
        Self {
            boss_id,
            boss_type: boss_type.into(),
            tier,
            started_at_ms,
            finished_at_ms: AtomicI64::new(NOT_FINISHED),
            participants: DashMap::new(),
            total_damage: AtomicF64::default(),
            total_hits: AtomicU64::new(0),
        }
    }

    pub fn boss_id(&self) -> BossId {
        self.boss_id
    }

    pub fn boss_type(&self) -> &str {
        &self.boss_type
    }

    pub fn tier(&self) -> BossTier {
        self.tier
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Record one hit.
    ///
    /// Returns `false` without touching the ledger when `damage` is not a
    /// positive finite number or `participant` is nil.
    pub fn record(&self, participant: ParticipantId, damage: f64, timestamp_ms: i64) -> bool {
        if participant.is_nil() || !damage.is_finite() || damage <= 0.0 {
            return false;
        }

        let first_hit = match self.participants.entry(participant) {
            Entry::Occupied(mut entry) => {
                let stats = entry.get_mut();
                stats.damage += damage;
                stats.hits += 1;
                stats.last_hit_ms = timestamp_ms;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(ParticipantStats {
                    damage,
                    hits: 1,
                    last_hit_ms: timestamp_ms,
                });
                true
            }
        };

        self.total_damage.fetch_add(damage);
        self.total_hits.fetch_add(1, Ordering::AcqRel);

        if first_hit {
            debug!(boss = %self.boss_id, %participant, damage, "ledger: new participant");
        }
        true
    }

    /// Mark the encounter as finished at `now_ms`.
    ///
    /// Only the first call takes effect; returns whether this call did.
    pub fn finish(&self, now_ms: i64) -> bool {
        self.finished_at_ms
            .compare_exchange(NOT_FINISHED, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Drop all recorded damage and hits.
    pub fn clear(&self) {
        self.participants.clear();
        self.total_damage.store(0.0);
        self.total_hits.store(0, Ordering::Release);
        debug!(boss = %self.boss_id, "ledger: cleared");
    }

    // ------------------------------------------------------------------
    // Per-participant reads
    // ------------------------------------------------------------------

    /// Damage dealt by `participant`, 0 if unknown.
    pub fn damage_of(&self, participant: &ParticipantId) -> f64 {
        self.participants
            .get(participant)
            .map(|s| s.damage)
            .unwrap_or(0.0)
    }

    /// Hits landed by `participant`, 0 if unknown.
    pub fn hits_of(&self, participant: &ParticipantId) -> u64 {
        self.participants.get(participant).map(|s| s.hits).unwrap_or(0)
    }

    pub fn last_hit_of(&self, participant: &ParticipantId) -> Option<i64> {
        self.participants.get(participant).map(|s| s.last_hit_ms)
    }

    pub fn stats_of(&self, participant: &ParticipantId) -> Option<ParticipantStats> {
        self.participants.get(participant).map(|s| *s)
    }

    /// Share of the total damage dealt by `participant`, in `[0, 1]`.
    ///
    /// Returns 0 while the total is not positive.
    pub fn percentage_of(&self, participant: &ParticipantId) -> f64 {
        let total = self.total_damage();
        if total <= 0.0 {
            return 0.0;
        }
        self.damage_of(participant) / total
    }

    /// Mean damage per hit for `participant`, 0 if they never hit.
    pub fn average_damage_per_hit(&self, participant: &ParticipantId) -> f64 {
        match self.stats_of(participant) {
            Some(s) if s.hits > 0 => s.damage / s.hits as f64,
            _ => 0.0,
        }
    }

    /// 1-based position in the damage ranking.
    pub fn rank_of(&self, participant: &ParticipantId) -> Option<usize> {
        self.ranking()
            .iter()
            .position(|(id, _)| id == participant)
            .map(|i| i + 1)
    }

    // ------------------------------------------------------------------
    // Encounter-wide reads
    // ------------------------------------------------------------------

    pub fn total_damage(&self) -> f64 {
        self.total_damage.load()
    }

    pub fn total_hits(&self) -> u64 {
        self.total_hits.load(Ordering::Acquire)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Every participant with recorded (hence positive) damage.
    pub fn participants(&self) -> HashSet<ParticipantId> {
        self.participants.iter().map(|e| *e.key()).collect()
    }

    pub fn average_damage_per_participant(&self) -> f64 {
        let count = self.participant_count();
        if count == 0 {
            return 0.0;
        }
        self.total_damage() / count as f64
    }

    /// Participants ordered by descending damage, ties by ascending id.
    pub fn ranking(&self) -> Vec<(ParticipantId, ParticipantStats)> {
        let mut ranked: Vec<_> = self
            .participants
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        ranked.sort_by(|a, b| b.1.damage.total_cmp(&a.1.damage).then(a.0.cmp(&b.0)));
        ranked
    }

    /// At most `limit` participant ids, highest damage first.
    pub fn top_damagers(&self, limit: usize) -> std::vec::IntoIter<ParticipantId> {
        let mut ranked = self.ranking();
        ranked.truncate(limit);
        ranked
            .into_iter()
            .map(|(id, _)| id)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn top_damager(&self) -> Option<ParticipantId> {
        self.top_damagers(1).next()
    }

    pub fn finished_at_ms(&self) -> Option<i64> {
        match self.finished_at_ms.load(Ordering::Acquire) {
            NOT_FINISHED => None,
            ts => Some(ts),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at_ms().is_some()
    }

    /// Elapsed encounter time: up to the finish mark if set, else up to `now_ms`.
    pub fn duration_ms(&self, now_ms: i64) -> u64 {
        let end = self.finished_at_ms().unwrap_or(now_ms);
        u64::try_from(end.saturating_sub(self.started_at_ms)).unwrap_or(0)
    }

    /// Copy out the current state for reporting and reward allocation.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let participants: BTreeMap<_, _> = self
            .participants
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        LedgerSnapshot {
            boss_id: self.boss_id,
            boss_type: self.boss_type.clone(),
            tier: self.tier,
            started_at_ms: self.started_at_ms,
            finished_at_ms: self.finished_at_ms(),
            total_damage: self.total_damage(),
            total_hits: self.total_hits(),
            participants,
        }
    }
}

/// Point-in-time copy of a [`DamageLedger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub boss_id: BossId,
    pub boss_type: String,
    pub tier: BossTier,
    pub started_at_ms: i64,
    pub finished_at_ms: Option<i64>,
    pub total_damage: f64,
    pub total_hits: u64,
    pub participants: BTreeMap<ParticipantId, ParticipantStats>,
}

impl LedgerSnapshot {
    /// Damage per participant, the shape the reward allocator consumes.
    pub fn damages(&self) -> HashMap<ParticipantId, f64> {
        self.participants
            .iter()
            .map(|(id, s)| (*id, s.damage))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn pid(n: u128) -> ParticipantId {
        ParticipantId(Uuid::from_u128(n))
    }

    fn ledger() -> DamageLedger {
        DamageLedger::new(BossId::random(), "SkeletonKing", BossTier::Elite, 1_000)
    }

    // ------------------------------------------------------------------
    // record / guards
    // ------------------------------------------------------------------

    #[test]
    fn record_accumulates_per_participant() {
        let l = ledger();
        assert!(l.record(pid(1), 100.0, 1_100));
        assert!(l.record(pid(1), 50.0, 1_200));
        assert!(l.record(pid(2), 25.0, 1_300));

        assert_eq!(l.damage_of(&pid(1)), 150.0);
        assert_eq!(l.hits_of(&pid(1)), 2);
        assert_eq!(l.last_hit_of(&pid(1)), Some(1_200));
        assert_eq!(l.total_damage(), 175.0);
        assert_eq!(l.total_hits(), 3);
        assert_eq!(l.participant_count(), 2);
    }

    #[test]
    fn record_rejects_invalid_input() {
        let l = ledger();
        assert!(!l.record(pid(1), 0.0, 0));
        assert!(!l.record(pid(1), -5.0, 0));
        assert!(!l.record(pid(1), f64::NAN, 0));
        assert!(!l.record(pid(1), f64::INFINITY, 0));
        assert!(!l.record(ParticipantId::NIL, 10.0, 0));

        assert_eq!(l.total_damage(), 0.0);
        assert_eq!(l.total_hits(), 0);
        assert!(l.participants().is_empty());
    }

    #[test]
    fn last_hit_is_overwritten_not_maxed() {
        let l = ledger();
        l.record(pid(1), 1.0, 5_000);
        l.record(pid(1), 1.0, 4_000);
        assert_eq!(l.last_hit_of(&pid(1)), Some(4_000));
    }

    #[test]
    fn unknown_participant_reads_zero() {
        let l = ledger();
        assert_eq!(l.damage_of(&pid(9)), 0.0);
        assert_eq!(l.hits_of(&pid(9)), 0);
        assert_eq!(l.last_hit_of(&pid(9)), None);
        assert_eq!(l.percentage_of(&pid(9)), 0.0);
        assert_eq!(l.average_damage_per_hit(&pid(9)), 0.0);
        assert_eq!(l.rank_of(&pid(9)), None);
    }

    // ------------------------------------------------------------------
    // Derived figures
    // ------------------------------------------------------------------

    #[test]
    fn percentages_partition_the_total() {
        let l = ledger();
        l.record(pid(1), 150.0, 0);
        l.record(pid(2), 350.0, 0);
        l.record(pid(3), 500.0, 0);

        assert!((l.percentage_of(&pid(1)) - 0.15).abs() < 1e-12);
        assert!((l.percentage_of(&pid(3)) - 0.5).abs() < 1e-12);
        let sum: f64 = l.participants().iter().map(|p| l.percentage_of(p)).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn percentage_is_zero_on_empty_ledger() {
        assert_eq!(ledger().percentage_of(&pid(1)), 0.0);
    }

    #[test]
    fn averages() {
        let l = ledger();
        l.record(pid(1), 30.0, 0);
        l.record(pid(1), 10.0, 0);
        l.record(pid(2), 20.0, 0);
        assert_eq!(l.average_damage_per_hit(&pid(1)), 20.0);
        assert_eq!(l.average_damage_per_participant(), 30.0);
        assert_eq!(ledger().average_damage_per_participant(), 0.0);
    }

    // ------------------------------------------------------------------
    // Ranking
    // ------------------------------------------------------------------

    #[test]
    fn top_damagers_descending_with_id_tiebreak() {
        let l = ledger();
        l.record(pid(3), 100.0, 0);
        l.record(pid(1), 100.0, 0);
        l.record(pid(2), 300.0, 0);
        l.record(pid(4), 50.0, 0);

        let top: Vec<_> = l.top_damagers(3).collect();
        assert_eq!(top, vec![pid(2), pid(1), pid(3)]);
        assert_eq!(l.top_damager(), Some(pid(2)));
        assert_eq!(l.rank_of(&pid(4)), Some(4));
    }

    #[test]
    fn top_damagers_limit_bounds_length() {
        let l = ledger();
        l.record(pid(1), 1.0, 0);
        assert_eq!(l.top_damagers(0).count(), 0);
        assert_eq!(l.top_damagers(10).len(), 1);
        assert_eq!(ledger().top_damager(), None);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    #[test]
    fn finish_first_call_wins() {
        let l = ledger();
        assert!(!l.is_finished());
        assert_eq!(l.duration_ms(4_000), 3_000);

        assert!(l.finish(6_000));
        assert!(!l.finish(9_000));
        assert_eq!(l.finished_at_ms(), Some(6_000));
        assert_eq!(l.duration_ms(100_000), 5_000);
    }

    #[test]
    fn duration_never_negative() {
        let l = ledger();
        assert_eq!(l.duration_ms(0), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let l = ledger();
        l.record(pid(1), 10.0, 0);
        l.record(pid(2), 10.0, 0);
        l.clear();
        assert_eq!(l.total_damage(), 0.0);
        assert_eq!(l.total_hits(), 0);
        assert_eq!(l.participant_count(), 0);
        assert!(l.record(pid(1), 5.0, 0));
        assert_eq!(l.total_damage(), 5.0);
    }

    #[test]
    fn snapshot_copies_state() {
        let l = ledger();
        l.record(pid(1), 10.0, 1_500);
        l.finish(2_000);
        let snap = l.snapshot();
        assert_eq!(snap.boss_type, "SkeletonKing");
        assert_eq!(snap.tier, BossTier::Elite);
        assert_eq!(snap.finished_at_ms, Some(2_000));
        assert_eq!(snap.total_hits, 1);
        assert_eq!(snap.damages().get(&pid(1)), Some(&10.0));

        let json = serde_json::to_string(&snap).unwrap();
        let back: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    // ------------------------------------------------------------------
    // Concurrency
    // ------------------------------------------------------------------

    #[test]
    fn concurrent_records_conserve_totals() {
        let l = Arc::new(ledger());
        std::thread::scope(|s| {
            for t in 0..8u128 {
                let l = Arc::clone(&l);
                s.spawn(move || {
                    for i in 0..500 {
                        // Half the threads share participant 1.
                        let who = if t % 2 == 0 { pid(1) } else { pid(t + 10) };
                        l.record(who, 2.0, i);
                    }
                });
            }
        });

        assert_eq!(l.total_hits(), 4_000);
        assert_eq!(l.total_damage(), 8_000.0);
        assert_eq!(l.hits_of(&pid(1)), 2_000);
        let sum: f64 = l.participants().iter().map(|p| l.damage_of(p)).sum();
        assert_eq!(sum, l.total_damage());
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn conservation(hits in prop::collection::vec((0u128..6, -10.0f64..1_000.0), 0..200)) {
            let l = ledger();
            let mut accepted = 0u64;
            for (who, dmg) in &hits {
                if l.record(pid(*who + 1), *dmg, 0) {
                    accepted += 1;
                }
            }
            let damage_sum: f64 = l.participants().iter().map(|p| l.damage_of(p)).sum();
            let hit_sum: u64 = l.participants().iter().map(|p| l.hits_of(p)).sum();
            prop_assert!((damage_sum - l.total_damage()).abs() <= 1e-6 * l.total_damage().max(1.0));
            prop_assert_eq!(hit_sum, l.total_hits());
            prop_assert_eq!(accepted, l.total_hits());
        }

        #[test]
        fn percentages_sum_to_one(hits in prop::collection::vec((0u128..10, 0.1f64..1_000.0), 1..100)) {
            let l = ledger();
            for (who, dmg) in &hits {
                l.record(pid(*who + 1), *dmg, 0);
            }
            let sum: f64 = l.participants().iter().map(|p| l.percentage_of(p)).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        #[test]
        fn top_damagers_sorted(hits in prop::collection::vec((0u128..20, 0.1f64..100.0), 0..100), limit in 0usize..25) {
            let l = ledger();
            for (who, dmg) in &hits {
                l.record(pid(*who + 1), *dmg, 0);
            }
            let top: Vec<_> = l.top_damagers(limit).collect();
            prop_assert!(top.len() <= limit);
            for pair in top.windows(2) {
                prop_assert!(l.damage_of(&pair[0]) >= l.damage_of(&pair[1]));
            }
        }
    }
}
