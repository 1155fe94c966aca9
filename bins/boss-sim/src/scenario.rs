//! Scenario files and their replay.
//!
//! A scenario lists encounters with hits, scaling refreshes and an optional
//! conclusion, each at a millisecond offset from `start_ms`. Replay merges
//! all steps into one timeline and drives a [`BossEngine`] on a manual clock,
//! so the same file always yields the same numbers (participant and boss ids
//! aside, which are random).

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use boss_core::{BossId, BossTier, DamageEvent, KillHistory, ManualClock, ParticipantId};
use boss_engine::{BossEngine, Conclusion, EncounterReport, EngineConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Clock value at offset 0.
    #[serde(default)]
    pub start_ms: i64,
    /// Historical kills per boss type. Empty means no history at all.
    #[serde(default)]
    pub kill_history: HashMap<String, u32>,
    pub encounters: Vec<EncounterScript>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncounterScript {
    pub boss_type: String,
    /// Parsed with `BossTier::from_str`: "normal", "elite", "world_boss", "legendary".
    pub tier: String,
    #[serde(default)]
    pub spawn_at_ms: i64,
    #[serde(default)]
    pub hits: Vec<HitScript>,
    #[serde(default)]
    pub scale: Vec<ScaleScript>,
    /// Left open (and eventually purged) when absent.
    #[serde(default)]
    pub conclude_at_ms: Option<i64>,
    /// Participant name of the killing blow.
    #[serde(default)]
    pub killer: Option<String>,
    #[serde(default)]
    pub conclusion: Conclusion,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HitScript {
    pub at_ms: i64,
    pub participant: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleScript {
    pub at_ms: i64,
    pub player_average_power: f64,
    pub boss_recommended_power: f64,
    pub participants: u32,
}

/// Result of a replay.
#[derive(Debug, Serialize)]
pub struct Replay {
    /// Participant names and the ids they were given.
    pub participants: BTreeMap<String, ParticipantId>,
    pub reports: Vec<EncounterReport>,
    /// Encounters dropped by the final purge.
    pub purged: usize,
    /// Encounters still open after the purge.
    pub open: usize,
}

impl Replay {
    /// Human-readable summary, one block per concluded encounter.
    pub fn summary(&self) -> String {
        let names: HashMap<ParticipantId, &str> = self
            .participants
            .iter()
            .map(|(name, id)| (*id, name.as_str()))
            .collect();
        let mut out = String::new();
        for report in &self.reports {
            let _ = writeln!(
                out,
                "{} [{}] {} ms, difficulty {} ({}/100) x{:.2}, {}",
                report.ledger.boss_type,
                report.ledger.tier,
                report.facts.duration_ms,
                report.difficulty_level,
                report.difficulty_score,
                report.difficulty_multiplier,
                report.quality,
            );
            for (id, share) in report.allocation.ranked() {
                let name = names.get(&id).copied().unwrap_or("?");
                let marker = if report.allocation.killer == Some(id) { " [killer]" } else { "" };
                let _ = writeln!(
                    out,
                    "  {name:<12} {:>9.1} exp {:>7.1} spirits{marker}",
                    share.experience, share.spirits
                );
            }
        }
        let _ = writeln!(out, "purged {}, open {}", self.purged, self.open);
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Step<'a> {
    Spawn(BossTier),
    Hit(&'a HitScript),
    Scale(&'a ScaleScript),
    Conclude,
}

impl Step<'_> {
    /// Order of steps sharing a timestamp.
    fn rank(&self) -> u8 {
        match self {
            Step::Spawn(_) => 0,
            Step::Hit(_) => 1,
            Step::Scale(_) => 2,
            Step::Conclude => 3,
        }
    }
}

struct Action<'a> {
    /// Absolute clock time, `start_ms` plus the step's offset.
    at_ms: i64,
    encounter: usize,
    step: Step<'a>,
}

/// Check `scenario` and flatten it into a time-ordered list of actions.
fn timeline(scenario: &Scenario) -> Result<Vec<Action<'_>>> {
    let mut actions = Vec::new();
    for (i, enc) in scenario.encounters.iter().enumerate() {
        let ctx = || format!("encounter {i} ({})", enc.boss_type);
        let tier: BossTier = enc.tier.parse().with_context(ctx)?;
        let absolute = |offset: i64| {
            scenario
                .start_ms
                .checked_add(offset)
                .ok_or_else(|| anyhow!("{}: offset {offset} overflows start {}", ctx(), scenario.start_ms))
        };

        if let Some(end) = enc.conclude_at_ms {
            if end < enc.spawn_at_ms {
                bail!("{}: concludes at {end} before spawning at {}", ctx(), enc.spawn_at_ms);
            }
        }
        let in_window = |at: i64| at >= enc.spawn_at_ms && enc.conclude_at_ms.is_none_or(|end| at <= end);
        for hit in &enc.hits {
            if !in_window(hit.at_ms) {
                bail!("{}: hit at {} outside the encounter", ctx(), hit.at_ms);
            }
        }
        for scale in &enc.scale {
            if !in_window(scale.at_ms) {
                bail!("{}: scaling at {} outside the encounter", ctx(), scale.at_ms);
            }
        }

        actions.push(Action { at_ms: absolute(enc.spawn_at_ms)?, encounter: i, step: Step::Spawn(tier) });
        for h in &enc.hits {
            actions.push(Action { at_ms: absolute(h.at_ms)?, encounter: i, step: Step::Hit(h) });
        }
        for s in &enc.scale {
            actions.push(Action { at_ms: absolute(s.at_ms)?, encounter: i, step: Step::Scale(s) });
        }
        if let Some(end) = enc.conclude_at_ms {
            actions.push(Action { at_ms: absolute(end)?, encounter: i, step: Step::Conclude });
        }
    }
    actions.sort_by_key(|a| (a.at_ms, a.step.rank(), a.encounter));
    Ok(actions)
}

/// Replay `scenario` through a fresh engine built from `config`.
pub fn replay(scenario: &Scenario, config: EngineConfig) -> Result<Replay> {
    let actions = timeline(scenario)?;

    let clock = Arc::new(ManualClock::new(scenario.start_ms));
    let history: Option<Arc<dyn KillHistory>> = if scenario.kill_history.is_empty() {
        None
    } else {
        Some(Arc::new(scenario.kill_history.clone()))
    };
    let engine = BossEngine::new(config, clock.clone(), history)?;

    let boss_ids: Vec<BossId> = scenario.encounters.iter().map(|_| BossId::random()).collect();
    let mut participants: BTreeMap<String, ParticipantId> = BTreeMap::new();
    let mut id_of = |name: &str| *participants.entry(name.to_string()).or_insert_with(ParticipantId::random);
    let mut reports = Vec::new();

    for action in &actions {
        let enc = &scenario.encounters[action.encounter];
        let boss_id = boss_ids[action.encounter];
        clock.set(action.at_ms);

        match action.step {
            Step::Spawn(tier) => {
                engine.spawn(boss_id, &enc.boss_type, tier);
            }
            Step::Hit(hit) => {
                let event = DamageEvent {
                    boss_id,
                    participant_id: id_of(&hit.participant),
                    amount: hit.amount,
                    timestamp_ms: action.at_ms,
                };
                if !engine.record(&event) {
                    warn!(participant = %hit.participant, amount = hit.amount, "sim: hit rejected");
                }
            }
            Step::Scale(s) => {
                engine.scale(boss_id, s.player_average_power, s.boss_recommended_power, s.participants);
            }
            Step::Conclude => {
                let killer = enc.killer.as_deref().map(&mut id_of);
                let report = engine
                    .conclude(boss_id, &enc.conclusion, killer)
                    .with_context(|| format!("concluding encounter {}", action.encounter))?;
                reports.push(report);
            }
        }
    }

    let purged = engine.purge_expired();
    let open = engine.active_encounters();
    info!(encounters = scenario.encounters.len(), concluded = reports.len(), purged, open, "sim: replay finished");

    Ok(Replay {
        participants,
        reports,
        purged,
        open,
    })
}
