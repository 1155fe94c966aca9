//! Shared helpers for the integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use boss_core::{BossId, DamageEvent, KillHistory, ManualClock, ParticipantId};
use boss_engine::{BossEngine, Conclusion, EngineConfig};
use uuid::Uuid;

/// Start time of every replay clock.
pub const T0: i64 = 1_700_000_000_000;

/// Deterministic participant id.
pub fn pid(n: u128) -> ParticipantId {
    ParticipantId(Uuid::from_u128(n))
}

/// Deterministic boss id, disjoint from participant ids.
pub fn boss(n: u128) -> BossId {
    BossId(Uuid::from_u128(0xB055_0000_0000 + n))
}

pub fn hit(boss_id: BossId, who: ParticipantId, amount: f64, timestamp_ms: i64) -> DamageEvent {
    DamageEvent {
        boss_id,
        participant_id: who,
        amount,
        timestamp_ms,
    }
}

/// Kill history backed by a fixed table.
pub fn history(entries: &[(&str, u32)]) -> Arc<dyn KillHistory> {
    let table: HashMap<String, u32> = entries
        .iter()
        .map(|(name, kills)| (name.to_string(), *kills))
        .collect();
    Arc::new(table)
}

/// An engine with default config on a manual clock at [`T0`].
pub fn engine(history: Option<Arc<dyn KillHistory>>) -> (BossEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let engine = BossEngine::new(EngineConfig::default(), clock.clone(), history)
        .unwrap_or_else(|e| panic!("default config must validate: {e}"));
    (engine, clock)
}

/// Conclusion with players exactly at the recommended power and no deaths.
pub fn clean_kill() -> Conclusion {
    Conclusion {
        player_average_power: 1_000.0,
        boss_recommended_power: 1_000.0,
        ..Conclusion::default()
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * b.abs().max(1.0)
}
