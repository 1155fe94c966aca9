//! The encounter pipeline.
//!
//! ```text
//! spawn ─► record* ─► scale* ─► conclude
//!   │         │          │          │
//!   │      ledger     scaler    finish ledger, rate difficulty,
//!   │                           score quality, size pools,
//!   └─ ledger + scaler          split rewards, log the kill
//! ```
//!
//! Collaborators (clock, kill history) are injected at construction. The
//! engine holds one [`DifficultyRater`] per boss type so that the recent-kill
//! window spans consecutive spawns of the same boss.

use std::sync::Arc;

use boss_core::{
    AttributeMultipliers, BossId, BossTier, Clock, DamageEvent, EncounterFacts, EngineError,
    KillHistory, ParticipantId,
};
use boss_ledger::{DamageLedger, LedgerRegistry, LedgerSnapshot};
use boss_rewards::{QualityScore, QualityScorer, RewardAllocation, RewardAllocator, RewardPools};
use boss_scaling::{DifficultyLevel, DifficultyRater, DifficultyScaler, ThreatBand};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// Per-boss components that live as long as the encounter.
#[derive(Debug)]
struct Encounter {
    ledger: Arc<DamageLedger>,
    scaler: DifficultyScaler,
    scorer: QualityScorer,
    allocator: RewardAllocator,
}

/// How an encounter ended, as reported by the game.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Conclusion {
    pub player_average_power: f64,
    pub boss_recommended_power: f64,
    pub death_count: u32,
    pub boss_was_weakened: bool,
    pub was_farm_kill: bool,
}

/// Everything computed when an encounter concludes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterReport {
    pub ledger: LedgerSnapshot,
    pub top_damagers: Vec<ParticipantId>,
    pub killer: Option<ParticipantId>,
    pub multipliers: AttributeMultipliers,
    pub threat_band: ThreatBand,
    pub difficulty_score: u8,
    pub difficulty_level: DifficultyLevel,
    pub difficulty_multiplier: f64,
    pub facts: EncounterFacts,
    pub quality: QualityScore,
    pub pools: RewardPools,
    pub allocation: RewardAllocation,
}

/// Entry point wiring ledgers, scaling, rating, quality and rewards.
pub struct BossEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    history: Option<Arc<dyn KillHistory>>,
    ledgers: LedgerRegistry,
    encounters: DashMap<BossId, Arc<Encounter>>,
    raters: DashMap<String, Arc<DifficultyRater>>,
}

impl BossEngine {
    /// Build an engine. Fails only if `config` does not validate.
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        history: Option<Arc<dyn KillHistory>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            history,
            ledgers: LedgerRegistry::new(),
            encounters: DashMap::new(),
            raters: DashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start tracking `boss_id`. Spawning a boss that is already tracked
    /// returns its existing ledger.
    pub fn spawn(&self, boss_id: BossId, boss_type: &str, tier: BossTier) -> Arc<DamageLedger> {
        let now = self.clock.now_ms();
        let ledger = self.ledgers.open(boss_id, boss_type, tier, now);

        self.encounters.entry(boss_id).or_insert_with(|| {
            let scaler = DifficultyScaler::new(
                boss_id,
                boss_type,
                tier,
                self.history.clone(),
                Arc::clone(&self.clock),
            );
            scaler.set_cache_expire_ms(self.config.cache_expire_ms);
            Arc::new(Encounter {
                ledger: Arc::clone(&ledger),
                scaler,
                scorer: QualityScorer::new(boss_id),
                allocator: RewardAllocator::new(tier),
            })
        });
        self.rater_for(boss_type);
        ledger
    }

    /// Route a hit to its encounter. Unknown bosses and invalid hits are dropped.
    pub fn record(&self, event: &DamageEvent) -> bool {
        self.ledgers.record(event)
    }

    /// Refresh the live multipliers of `boss_id`.
    ///
    /// Returns the multipliers now in effect, which are the previous ones if
    /// the refresh failed. `None` for an unknown boss.
    pub fn scale(
        &self,
        boss_id: BossId,
        player_average_power: f64,
        boss_recommended_power: f64,
        participant_count: u32,
    ) -> Option<AttributeMultipliers> {
        let encounter = self.encounter(&boss_id)?;
        // A failure was already logged by the scaler; keep serving the old values.
        let _ = encounter.scaler.calculate_progression(
            player_average_power,
            boss_recommended_power,
            participant_count,
        );
        Some(encounter.scaler.multipliers())
    }

    /// Close the encounter and compute its report.
    ///
    /// The boss is forgotten afterwards; a second call for the same boss
    /// fails with [`EngineError::UnknownBoss`].
    pub fn conclude(
        &self,
        boss_id: BossId,
        conclusion: &Conclusion,
        killer: Option<ParticipantId>,
    ) -> Result<EncounterReport, EngineError> {
        let (_, encounter) = self
            .encounters
            .remove(&boss_id)
            .ok_or(EngineError::UnknownBoss(boss_id))?;
        self.ledgers.remove(&boss_id);

        let now = self.clock.now_ms();
        let ledger = &encounter.ledger;
        ledger.finish(now);
        let snapshot = ledger.snapshot();
        let participants = u32::try_from(ledger.participant_count()).unwrap_or(u32::MAX);

        let rater = self.rater_for(ledger.boss_type());
        let total_kills = self.kill_count(ledger.boss_type());
        let recent_kills = rater.recent_kill_count(now);
        rater.force_update();
        let difficulty_score = rater.calculate_score(
            participants,
            conclusion.player_average_power,
            conclusion.boss_recommended_power,
            total_kills,
            recent_kills,
        );
        let difficulty_multiplier = rater.difficulty_multiplier(
            participants,
            conclusion.player_average_power,
            conclusion.boss_recommended_power,
            total_kills,
            recent_kills,
        );

        let facts = EncounterFacts {
            participant_count: participants,
            boss_level: ledger.tier().level(),
            difficulty_score,
            duration_ms: ledger.duration_ms(now),
            death_count: conclusion.death_count,
            boss_was_weakened: conclusion.boss_was_weakened,
            was_farm_kill: conclusion.was_farm_kill,
        };
        let quality = encounter.scorer.calculate_quality(&facts);

        let pools = encounter
            .allocator
            .pools(quality.experience_multiplier(), difficulty_multiplier);
        let allocation = encounter.allocator.allocate(pools, &snapshot.damages(), killer);

        rater.record_kill(now);

        info!(
            boss = %boss_id,
            boss_type = ledger.boss_type(),
            participants,
            quality = %quality.level,
            difficulty = difficulty_score,
            rewarded = allocation.len(),
            "engine: encounter concluded"
        );

        Ok(EncounterReport {
            top_damagers: ledger.top_damagers(self.config.top_damagers_limit).collect(),
            killer,
            multipliers: encounter.scaler.multipliers(),
            threat_band: encounter.scaler.threat_band(),
            difficulty_score,
            difficulty_level: rater.level(),
            difficulty_multiplier,
            facts,
            quality,
            pools,
            allocation,
            ledger: snapshot,
        })
    }

    /// Forget encounters older than `ledger_max_age_ms`. Returns how many.
    pub fn purge_expired(&self) -> usize {
        let removed = self
            .ledgers
            .purge_expired(self.clock.now_ms(), self.config.ledger_max_age_ms);
        if removed > 0 {
            self.encounters.retain(|id, _| self.ledgers.contains(id));
        }
        removed
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn ledger(&self, boss_id: &BossId) -> Option<Arc<DamageLedger>> {
        self.ledgers.get(boss_id)
    }

    pub fn multipliers(&self, boss_id: &BossId) -> Option<AttributeMultipliers> {
        self.encounter(boss_id).map(|e| e.scaler.multipliers())
    }

    /// Top damagers of a live encounter, `top_damagers_limit` long at most.
    pub fn top_damagers(&self, boss_id: &BossId) -> Vec<ParticipantId> {
        self.ledgers
            .get(boss_id)
            .map(|l| l.top_damagers(self.config.top_damagers_limit).collect())
            .unwrap_or_default()
    }

    pub fn rater(&self, boss_type: &str) -> Option<Arc<DifficultyRater>> {
        self.raters.get(boss_type).map(|r| Arc::clone(r.value()))
    }

    pub fn active_encounters(&self) -> usize {
        self.encounters.len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn encounter(&self, boss_id: &BossId) -> Option<Arc<Encounter>> {
        self.encounters.get(boss_id).map(|e| Arc::clone(e.value()))
    }

    fn rater_for(&self, boss_type: &str) -> Arc<DifficultyRater> {
        let entry = self.raters.entry(boss_type.to_string()).or_insert_with(|| {
            let rater = DifficultyRater::new(boss_type, Arc::clone(&self.clock));
            rater.set_update_interval_ms(self.config.rating_update_interval_ms);
            debug!(boss_type, "engine: rater created");
            Arc::new(rater)
        });
        Arc::clone(entry.value())
    }

    /// Historical kills of `boss_type`; 0 without a history or on failure.
    fn kill_count(&self, boss_type: &str) -> u32 {
        let Some(history) = &self.history else {
            return 0;
        };
        match history.kill_count(boss_type) {
            Ok(kills) => kills,
            Err(e) => {
                warn!(boss_type, error = %e, "engine: kill history failed, counting zero kills");
                0
            }
        }
    }
}

impl std::fmt::Debug for BossEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BossEngine")
            .field("config", &self.config)
            .field("has_history", &self.history.is_some())
            .field("encounters", &self.encounters.len())
            .field("raters", &self.raters.len())
            .finish()
    }
}
