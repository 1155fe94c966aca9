//! Attribute progression for a live boss.
//!
//! Six multipliers scale a boss's base stats. They are recomputed from three
//! inputs:
//!
//! | Input | Modifier |
//! |---|---|
//! | tier | `base = level × 10` |
//! | historical kills `k` | `kill = min(1 + 0.05k, 2.5)` |
//! | power gap `d = (avg − rec) / rec` | `2.0` if `d < −0.5`, `0.5` if `d > 0.5`, else `1 + d` |
//!
//! and combined as:
//!
//! | Multiplier | Formula | Ceiling |
//! |---|---|---|
//! | health | `base × kill × power` | 5.0 |
//! | damage | `health × 0.6` | 3.0 |
//! | armor | `health × 0.3` | 1.5 |
//! | speed | `1 + (kill − 1) × 0.5` | 2.0 |
//! | attack range | `1 + (kill − 1) × 0.3` | 1.5 |
//! | drop | `health` | 3.0 |
//!
//! Every multiplier is floored at [`MULTIPLIER_FLOOR`].
//!
//! Results are cached for `cache_expire_ms`. The cache check and the write
//! are not one critical section: two callers racing past an expired cache
//! both recompute, and the last write wins. Both compute from the same
//! inputs, so the cache is at most stale, never wrong.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use boss_core::constants::{DEFAULT_CACHE_EXPIRE_MS, MULTIPLIER_FLOOR};
use boss_core::{AttributeMultipliers, BossId, BossTier, Clock, KillHistory, ScalingError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MAX_HEALTH_MULTIPLIER: f64 = 5.0;
pub const MAX_DAMAGE_MULTIPLIER: f64 = 3.0;
pub const MAX_SPEED_MULTIPLIER: f64 = 2.0;
pub const MAX_ARMOR_MULTIPLIER: f64 = 1.5;
pub const MAX_ATTACK_RANGE_MULTIPLIER: f64 = 1.5;
pub const MAX_DROP_MULTIPLIER: f64 = 3.0;

/// Kill modifier growth per historical kill.
pub const KILL_MODIFIER_PER_KILL: f64 = 0.05;
/// Kill modifier ceiling (reached at 30 kills).
pub const MAX_KILL_MODIFIER: f64 = 2.5;

/// Damage multiplier as a fraction of the health multiplier.
pub const DAMAGE_TO_HEALTH_RATIO: f64 = 0.6;
/// Armor multiplier as a fraction of the health multiplier.
pub const ARMOR_TO_HEALTH_RATIO: f64 = 0.3;

/// Power gap beyond which players count as clearly under-powered.
pub const POWER_WEAK_THRESHOLD: f64 = -0.5;
/// Power gap beyond which players count as clearly over-powered.
pub const POWER_STRONG_THRESHOLD: f64 = 0.5;
pub const POWER_WEAK_MODIFIER: f64 = 2.0;
pub const POWER_STRONG_MODIFIER: f64 = 0.5;

const NEVER: i64 = i64::MIN;

// ------------------------------------------------------------------
// Pure formulas
// ------------------------------------------------------------------

/// `min(1 + kills × 0.05, 2.5)`.
pub fn kill_count_modifier(kills: u32) -> f64 {
    (1.0 + f64::from(kills) * KILL_MODIFIER_PER_KILL).min(MAX_KILL_MODIFIER)
}

/// Modifier for the gap between the players' average power and the boss's
/// recommended power. A non-positive recommendation or a non-finite gap means
/// "no opinion" (1.0).
pub fn player_power_modifier(average_power: f64, recommended_power: f64) -> f64 {
    if recommended_power <= 0.0 {
        return 1.0;
    }
    let diff = (average_power - recommended_power) / recommended_power;
    if !diff.is_finite() {
        1.0
    } else if diff < POWER_WEAK_THRESHOLD {
        POWER_WEAK_MODIFIER
    } else if diff > POWER_STRONG_THRESHOLD {
        POWER_STRONG_MODIFIER
    } else {
        1.0 + diff
    }
}

/// Combine the tier base, kill modifier and power modifier into the six
/// multipliers, each clamped to `[1.0, ceiling]`.
pub fn compute_multipliers(base_tier: f64, kill_modifier: f64, power_modifier: f64) -> AttributeMultipliers {
    let bounded = |value: f64, ceiling: f64| value.min(ceiling).max(MULTIPLIER_FLOOR);

    let health = bounded(base_tier * kill_modifier * power_modifier, MAX_HEALTH_MULTIPLIER);
    AttributeMultipliers {
        health,
        damage: bounded(health * DAMAGE_TO_HEALTH_RATIO, MAX_DAMAGE_MULTIPLIER),
        speed: bounded(1.0 + (kill_modifier - 1.0) * 0.5, MAX_SPEED_MULTIPLIER),
        armor: bounded(health * ARMOR_TO_HEALTH_RATIO, MAX_ARMOR_MULTIPLIER),
        attack_range: bounded(1.0 + (kill_modifier - 1.0) * 0.3, MAX_ATTACK_RANGE_MULTIPLIER),
        drop: bounded(health, MAX_DROP_MULTIPLIER),
    }
}

/// Multipliers for a boss with no kill history facing matched players.
pub fn tier_base_multipliers(tier: BossTier) -> AttributeMultipliers {
    compute_multipliers(tier.health_multiplier(), 1.0, 1.0)
}

// ------------------------------------------------------------------
// ThreatBand
// ------------------------------------------------------------------

/// Coarse threat classification of the current health/damage scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatBand {
    Easy,
    Normal,
    Hard,
    Hell,
    Desperate,
}

impl ThreatBand {
    /// Classify `(health + damage) / 2`.
    pub fn from_average(average: f64) -> Self {
        if average < 1.2 {
            ThreatBand::Easy
        } else if average < 1.5 {
            ThreatBand::Normal
        } else if average < 2.0 {
            ThreatBand::Hard
        } else if average < 3.0 {
            ThreatBand::Hell
        } else {
            ThreatBand::Desperate
        }
    }

    pub fn of(multipliers: &AttributeMultipliers) -> Self {
        Self::from_average((multipliers.health + multipliers.damage) / 2.0)
    }
}

impl fmt::Display for ThreatBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreatBand::Easy => "Easy",
            ThreatBand::Normal => "Normal",
            ThreatBand::Hard => "Hard",
            ThreatBand::Hell => "Hell",
            ThreatBand::Desperate => "Desperate",
        };
        f.write_str(name)
    }
}

// ------------------------------------------------------------------
// DifficultyScaler
// ------------------------------------------------------------------

/// Outcome of a successful [`DifficultyScaler::calculate_progression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The cached multipliers were still fresh; nothing was recomputed.
    Cached,
    Recomputed,
}

/// Attribute multipliers of one live boss.
///
/// Readers always see a consistent six-tuple: the multipliers are replaced as
/// a whole under a write lock.
pub struct DifficultyScaler {
    boss_id: BossId,
    boss_type: String,
    tier: BossTier,
    history: Option<Arc<dyn KillHistory>>,
    clock: Arc<dyn Clock>,
    multipliers: RwLock<AttributeMultipliers>,
    last_calculation_ms: AtomicI64,
    cache_expire_ms: AtomicI64,
}

impl DifficultyScaler {
    /// A scaler starting at the tier's base multipliers.
    ///
    /// `history: None` means no kill history is available; every query then
    /// counts zero kills.
    pub fn new(
        boss_id: BossId,
        boss_type: impl Into<String>,
        tier: BossTier,
        history: Option<Arc<dyn KillHistory>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            boss_id,
            boss_type: boss_type.into(),
            tier,
            history,
            clock,
            multipliers: RwLock::new(tier_base_multipliers(tier)),
            last_calculation_ms: AtomicI64::new(NEVER),
            cache_expire_ms: AtomicI64::new(DEFAULT_CACHE_EXPIRE_MS),
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

    /// Recompute the multipliers unless the cached ones are still fresh.
    ///
    /// On error the previous multipliers stay in place and a warning is
    /// logged; the error is returned for the caller's own context.
    pub fn calculate_progression(
        &self,
        player_average_power: f64,
        boss_recommended_power: f64,
        participant_count: u32,
    ) -> Result<Refresh, ScalingError> {
        let now = self.clock.now_ms();
        if self.is_cache_valid_at(now) {
            return Ok(Refresh::Cached);
        }

        match self.recompute(player_average_power, boss_recommended_power) {
            Ok((next, kills)) => {
                *self.multipliers.write() = next;
                self.last_calculation_ms.store(now, Ordering::Release);
                debug!(
                    boss = %self.boss_id,
                    kills,
                    participants = participant_count,
                    multipliers = %next,
                    "scaling: multipliers recomputed"
                );
                Ok(Refresh::Recomputed)
            }
            Err(e) => {
                warn!(boss = %self.boss_id, error = %e, "scaling: recompute failed, keeping previous multipliers");
                Err(e)
            }
        }
    }

    fn recompute(&self, average_power: f64, recommended_power: f64) -> Result<(AttributeMultipliers, u32), ScalingError> {
        for (name, value) in [
            ("player_average_power", average_power),
            ("boss_recommended_power", recommended_power),
        ] {
            if !value.is_finite() {
                return Err(ScalingError::NonFiniteInput { name, value });
            }
        }

        let kills = self.historical_kill_count()?;
        let next = compute_multipliers(
            self.tier.health_multiplier(),
            kill_count_modifier(kills),
            player_power_modifier(average_power, recommended_power),
        );
        if let Some(name) = next.first_non_finite() {
            return Err(ScalingError::NonFiniteMultiplier(name));
        }
        Ok((next, kills))
    }

    fn historical_kill_count(&self) -> Result<u32, ScalingError> {
        match &self.history {
            Some(history) => Ok(history.kill_count(&self.boss_type)?),
            None => Ok(0),
        }
    }

    fn is_cache_valid_at(&self, now_ms: i64) -> bool {
        let last = self.last_calculation_ms.load(Ordering::Acquire);
        now_ms.saturating_sub(last) < self.cache_expire_ms.load(Ordering::Acquire)
    }

    pub fn is_cache_valid(&self) -> bool {
        self.is_cache_valid_at(self.clock.now_ms())
    }

    /// Force the next `calculate_progression` to recompute.
    pub fn invalidate_cache(&self) {
        self.last_calculation_ms.store(NEVER, Ordering::Release);
    }

    pub fn set_cache_expire_ms(&self, cache_expire_ms: i64) {
        self.cache_expire_ms.store(cache_expire_ms, Ordering::Release);
    }

    pub fn cache_expire_ms(&self) -> i64 {
        self.cache_expire_ms.load(Ordering::Acquire)
    }

    /// Back to the tier's base multipliers, cache invalidated.
    pub fn reset(&self) {
        *self.multipliers.write() = tier_base_multipliers(self.tier);
        self.invalidate_cache();
        debug!(boss = %self.boss_id, "scaling: reset to tier base");
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn multipliers(&self) -> AttributeMultipliers {
        *self.multipliers.read()
    }

    pub fn health_multiplier(&self) -> f64 {
        self.multipliers.read().health
    }

    pub fn damage_multiplier(&self) -> f64 {
        self.multipliers.read().damage
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.multipliers.read().speed
    }

    pub fn armor_multiplier(&self) -> f64 {
        self.multipliers.read().armor
    }

    pub fn attack_range_multiplier(&self) -> f64 {
        self.multipliers.read().attack_range
    }

    pub fn drop_multiplier(&self) -> f64 {
        self.multipliers.read().drop
    }

    pub fn apply_health_multiplier(&self, base_health: f64) -> f64 {
        base_health * self.health_multiplier()
    }

    pub fn apply_damage_multiplier(&self, base_damage: f64) -> f64 {
        base_damage * self.damage_multiplier()
    }

    pub fn apply_speed_multiplier(&self, base_speed: f64) -> f64 {
        base_speed * self.speed_multiplier()
    }

    pub fn apply_armor_multiplier(&self, base_armor: f64) -> f64 {
        base_armor * self.armor_multiplier()
    }

    pub fn apply_attack_range_multiplier(&self, base_range: f64) -> f64 {
        base_range * self.attack_range_multiplier()
    }

    /// Scaled drop count: `max(1, floor(base × drop))`.
    pub fn apply_drop_multiplier(&self, base_drops: u32) -> u32 {
        ((f64::from(base_drops) * self.drop_multiplier()).floor() as u32).max(1)
    }

    pub fn threat_band(&self) -> ThreatBand {
        ThreatBand::of(&self.multipliers())
    }
}

impl fmt::Debug for DifficultyScaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifficultyScaler")
            .field("boss_id", &self.boss_id)
            .field("boss_type", &self.boss_type)
            .field("tier", &self.tier)
            .field("has_history", &self.history.is_some())
            .field("multipliers", &self.multipliers())
            .field("cache_expire_ms", &self.cache_expire_ms())
            .finish()
    }
}
