//! Reward pools and their damage-proportional split.
//!
//! A boss of tier level `L` is worth `100 × L` experience and `10 × L`
//! spirits before the quality and difficulty multipliers. Each pool is split
//! by damage share; participants below 1% of the total damage get nothing,
//! and the killing blow earns 20% on top of its proportional share. Shares
//! are therefore not renormalised: with a killer present the payout exceeds
//! the pool by up to 20%.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use boss_core::constants::{BASE_EXPERIENCE_PER_TIER, BASE_SPIRITS_PER_TIER};
use boss_core::{BossTier, ParticipantId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Extra share for the participant who landed the killing blow.
pub const KILLER_BONUS: f64 = 0.2;

/// Minimum fraction of the total damage required to receive any reward.
pub const MIN_DAMAGE_SHARE: f64 = 0.01;

/// How many entries [`RewardAllocation`]'s `Display` lists.
const REPORT_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// `pool × damage_share`, plus [`KILLER_BONUS`] for the killer.
pub fn player_share(pool: f64, damage_share: f64, is_killer: bool) -> f64 {
    let share = pool * damage_share;
    if is_killer { share * (1.0 + KILLER_BONUS) } else { share }
}

/// Scaled drop count, never below one.
pub fn drop_count(base_drops: u32, drop_multiplier: f64) -> u32 {
    ((f64::from(base_drops) * drop_multiplier).floor() as u32).max(1)
}

/// Chance of a rare drop, capped at certainty.
pub fn rarity_probability(base_rarity: f64, quality_multiplier: f64) -> f64 {
    (base_rarity * quality_multiplier).min(1.0)
}

/// Split `total_pool` by damage share.
///
/// Entries with non-finite or non-positive damage are ignored. Returns an
/// empty map when nothing is left, when the pool is negative or not finite,
/// or when the damage total overflows.
pub fn distribute(
    total_pool: f64,
    damages: &HashMap<ParticipantId, f64>,
    killer: Option<ParticipantId>,
) -> HashMap<ParticipantId, f64> {
    let mut rewards = HashMap::new();
    if !total_pool.is_finite() || total_pool < 0.0 {
        warn!(total_pool, "rewards: invalid pool, nothing distributed");
        return rewards;
    }

    let counted = || damages.iter().filter(|(_, d)| d.is_finite() && **d > 0.0);
    let total_damage: f64 = counted().map(|(_, d)| *d).sum();
    if !total_damage.is_finite() {
        warn!("rewards: damage total overflowed, nothing distributed");
        return rewards;
    }
    if total_damage <= 0.0 {
        return rewards;
    }

    let floor = total_damage * MIN_DAMAGE_SHARE;
    for (&id, &damage) in counted() {
        if damage < floor {
            continue;
        }
        let share = player_share(total_pool, damage / total_damage, killer == Some(id));
        rewards.insert(id, share);
    }
    rewards
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Total rewards available for one kill.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardPools {
    pub experience: f64,
    pub spirits: f64,
}

/// One participant's cut of both pools.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardShare {
    pub experience: f64,
    pub spirits: f64,
}

/// Rewards per participant. Participants under the damage floor are absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardAllocation {
    pub killer: Option<ParticipantId>,
    pub shares: BTreeMap<ParticipantId, RewardShare>,
}

impl RewardAllocation {
    pub fn get(&self, participant: &ParticipantId) -> Option<&RewardShare> {
        self.shares.get(participant)
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.shares.contains_key(participant)
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &RewardShare)> {
        self.shares.iter()
    }

    /// Shares ordered by descending experience, ties by ascending id.
    pub fn ranked(&self) -> Vec<(ParticipantId, RewardShare)> {
        let mut ranked: Vec<_> = self.shares.iter().map(|(id, s)| (*id, *s)).collect();
        ranked.sort_by(|a, b| b.1.experience.total_cmp(&a.1.experience).then(a.0.cmp(&b.0)));
        ranked
    }

    pub fn total_experience(&self) -> f64 {
        self.shares.values().map(|s| s.experience).sum()
    }

    pub fn total_spirits(&self) -> f64 {
        self.shares.values().map(|s| s.spirits).sum()
    }
}

impl fmt::Display for RewardAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} participants, {:.0} exp, {:.0} spirits",
            self.len(),
            self.total_experience(),
            self.total_spirits()
        )?;
        for (rank, (id, share)) in self.ranked().into_iter().take(REPORT_LIMIT).enumerate() {
            let short = id.to_string();
            let marker = if self.killer == Some(id) { " [killer]" } else { "" };
            writeln!(
                f,
                "{:>2}. {}: {:.0} exp, {:.0} spirits{}",
                rank + 1,
                &short[..8],
                share.experience,
                share.spirits,
                marker
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RewardAllocator
// ---------------------------------------------------------------------------

/// Reward sizing and splitting for bosses of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardAllocator {
    tier: BossTier,
}

impl RewardAllocator {
    pub fn new(tier: BossTier) -> Self {
        Self { tier }
    }

    pub fn tier(&self) -> BossTier {
        self.tier
    }

    pub fn base_experience(&self) -> f64 {
        BASE_EXPERIENCE_PER_TIER * f64::from(self.tier.level())
    }

    pub fn base_spirits(&self) -> f64 {
        BASE_SPIRITS_PER_TIER * f64::from(self.tier.level())
    }

    pub fn calculate_experience(&self, quality_multiplier: f64, difficulty_multiplier: f64) -> f64 {
        self.base_experience() * quality_multiplier * difficulty_multiplier
    }

    pub fn calculate_spirits(&self, quality_multiplier: f64, difficulty_multiplier: f64) -> f64 {
        self.base_spirits() * quality_multiplier * difficulty_multiplier
    }

    pub fn pools(&self, quality_multiplier: f64, difficulty_multiplier: f64) -> RewardPools {
        RewardPools {
            experience: self.calculate_experience(quality_multiplier, difficulty_multiplier),
            spirits: self.calculate_spirits(quality_multiplier, difficulty_multiplier),
        }
    }

    pub fn distribute(
        &self,
        total_pool: f64,
        damages: &HashMap<ParticipantId, f64>,
        killer: Option<ParticipantId>,
    ) -> HashMap<ParticipantId, f64> {
        distribute(total_pool, damages, killer)
    }

    /// Split both pools with the same damage shares.
    pub fn allocate(
        &self,
        pools: RewardPools,
        damages: &HashMap<ParticipantId, f64>,
        killer: Option<ParticipantId>,
    ) -> RewardAllocation {
        let experience = distribute(pools.experience, damages, killer);
        let spirits = distribute(pools.spirits, damages, killer);

        let mut shares: BTreeMap<ParticipantId, RewardShare> = BTreeMap::new();
        for (id, exp) in experience {
            shares.entry(id).or_default().experience = exp;
        }
        for (id, sp) in spirits {
            shares.entry(id).or_default().spirits = sp;
        }
        RewardAllocation { killer, shares }
    }

    pub fn drop_count(&self, base_drops: u32, drop_multiplier: f64) -> u32 {
        drop_count(base_drops, drop_multiplier)
    }

    pub fn rarity_probability(&self, base_rarity: f64, quality_multiplier: f64) -> f64 {
        rarity_probability(base_rarity, quality_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn pid(n: u128) -> ParticipantId {
        ParticipantId(Uuid::from_u128(n))
    }

    fn damages(entries: &[(u128, f64)]) -> HashMap<ParticipantId, f64> {
        entries.iter().map(|(n, d)| (pid(*n), *d)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ------------------------------------------------------------------
    // distribute
    // ------------------------------------------------------------------

    #[test]
    fn killer_gets_twenty_percent_extra() {
        let d = damages(&[(1, 150.0), (2, 350.0), (3, 500.0)]);
        let r = distribute(1_000.0, &d, Some(pid(3)));
        assert!(approx(r[&pid(1)], 150.0));
        assert!(approx(r[&pid(2)], 350.0));
        assert!(approx(r[&pid(3)], 600.0));
    }

    #[test]
    fn below_one_percent_is_excluded() {
        let d = damages(&[(1, 5.0), (2, 495.0), (3, 500.0)]);
        let r = distribute(1_000.0, &d, None);
        assert!(!r.contains_key(&pid(1)));
        assert!(approx(r[&pid(2)], 495.0));
        assert!(approx(r[&pid(3)], 500.0));
    }

    #[test]
    fn exactly_one_percent_is_kept() {
        let d = damages(&[(1, 10.0), (2, 990.0)]);
        let r = distribute(100.0, &d, None);
        assert!(approx(r[&pid(1)], 1.0));
    }

    #[test]
    fn empty_or_zero_damage_yields_nothing() {
        assert!(distribute(1_000.0, &HashMap::new(), None).is_empty());
        assert!(distribute(1_000.0, &damages(&[(1, 0.0), (2, -3.0)]), None).is_empty());
    }

    #[test]
    fn invalid_entries_are_ignored() {
        let d = damages(&[(1, f64::NAN), (2, 100.0), (3, f64::INFINITY), (4, -50.0)]);
        let r = distribute(10.0, &d, None);
        assert_eq!(r.len(), 1);
        assert!(approx(r[&pid(2)], 10.0));
    }

    #[test]
    fn invalid_pool_yields_nothing() {
        let d = damages(&[(1, 100.0)]);
        assert!(distribute(f64::NAN, &d, None).is_empty());
        assert!(distribute(f64::INFINITY, &d, None).is_empty());
        assert!(distribute(-1.0, &d, None).is_empty());
        assert!(approx(distribute(0.0, &d, None)[&pid(1)], 0.0));
    }

    #[test]
    fn overflowing_total_yields_nothing() {
        let d = damages(&[(1, f64::MAX), (2, f64::MAX)]);
        assert!(distribute(10.0, &d, None).is_empty());
    }

    #[test]
    fn killer_below_floor_gets_nothing() {
        let d = damages(&[(1, 1.0), (2, 999.0)]);
        let r = distribute(100.0, &d, Some(pid(1)));
        assert!(!r.contains_key(&pid(1)));
    }

    // ------------------------------------------------------------------
    // Pools and helpers
    // ------------------------------------------------------------------

    #[test]
    fn pools_scale_with_tier_quality_difficulty() {
        let alloc = RewardAllocator::new(BossTier::WorldBoss);
        assert_eq!(alloc.calculate_experience(1.0, 1.0), 300.0);
        assert_eq!(alloc.calculate_spirits(2.0, 1.5), 90.0);
        assert_eq!(
            alloc.pools(2.0, 1.0),
            RewardPools {
                experience: 600.0,
                spirits: 60.0
            }
        );
    }

    #[test]
    fn drop_count_and_rarity() {
        assert_eq!(drop_count(3, 2.5), 7);
        assert_eq!(drop_count(1, 0.5), 1);
        assert_eq!(drop_count(0, 3.0), 1);
        assert!(approx(rarity_probability(0.2, 3.0), 0.6));
        assert_eq!(rarity_probability(0.5, 3.0), 1.0);
    }

    // ------------------------------------------------------------------
    // allocate
    // ------------------------------------------------------------------

    #[test]
    fn allocate_splits_both_pools() {
        let alloc = RewardAllocator::new(BossTier::Elite);
        let d = damages(&[(1, 250.0), (2, 750.0)]);
        let a = alloc.allocate(alloc.pools(1.0, 1.0), &d, Some(pid(2)));

        assert_eq!(a.len(), 2);
        let top = a.get(&pid(2)).unwrap();
        assert!(approx(top.experience, 200.0 * 0.75 * 1.2));
        assert!(approx(top.spirits, 20.0 * 0.75 * 1.2));
        assert!(approx(a.total_experience(), 50.0 + 180.0));

        let ranked = a.ranked();
        assert_eq!(ranked[0].0, pid(2));
        assert_eq!(ranked[1].0, pid(1));
    }

    #[test]
    fn ranked_breaks_ties_by_id() {
        let alloc = RewardAllocator::new(BossTier::Normal);
        let d = damages(&[(9, 100.0), (4, 100.0)]);
        let a = alloc.allocate(alloc.pools(1.0, 1.0), &d, None);
        let ids: Vec<_> = a.ranked().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![pid(4), pid(9)]);
    }

    #[test]
    fn allocation_display_marks_killer() {
        let alloc = RewardAllocator::new(BossTier::Normal);
        let d = damages(&[(1, 100.0), (2, 300.0)]);
        let a = alloc.allocate(alloc.pools(1.0, 1.0), &d, Some(pid(1)));
        let text = a.to_string();
        assert!(text.starts_with("2 participants"));
        assert_eq!(text.matches("[killer]").count(), 1);
    }

    #[test]
    fn allocation_serializes() {
        let alloc = RewardAllocator::new(BossTier::Normal);
        let a = alloc.allocate(alloc.pools(1.0, 1.0), &damages(&[(1, 1.0)]), None);
        let json = serde_json::to_string(&a).unwrap();
        let back: RewardAllocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn payout_bounded_by_pool_plus_bonus(
            entries in prop::collection::vec((1u128..30, 0.0f64..10_000.0), 1..40),
            pool in 0.0f64..1.0e6,
            killer in 1u128..30,
        ) {
            let d: HashMap<_, _> = entries.iter().map(|(n, v)| (pid(*n), *v)).collect();
            let r = distribute(pool, &d, Some(pid(killer)));
            let paid: f64 = r.values().sum();
            prop_assert!(paid <= pool * (1.0 + KILLER_BONUS) + 1e-6);
            for v in r.values() {
                prop_assert!(*v >= 0.0);
            }
        }

        #[test]
        fn recipients_meet_floor(
            entries in prop::collection::vec((1u128..30, 0.0f64..10_000.0), 1..40),
        ) {
            let d: HashMap<_, _> = entries.iter().map(|(n, v)| (pid(*n), *v)).collect();
            let total: f64 = d.values().filter(|v| **v > 0.0).sum();
            let r = distribute(100.0, &d, None);
            for id in r.keys() {
                prop_assert!(d[id] >= total * MIN_DAMAGE_SHARE);
            }
        }
    }
}
