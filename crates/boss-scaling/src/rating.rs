//! Difficulty rating: a 0–100 score for the current encounter.
//!
//! The score starts at 50 and is adjusted by four signals:
//!
//! | Signal | Adjustment | Range |
//! |---|---|---|
//! | participants `n` | `(3 − n) × 10` | ±30 |
//! | power gap `d` | `trunc(d × 40)` | ±40 |
//! | historical kills `k` | `trunc(k × 0.6)` | 0..=30 |
//! | kills in the last hour `r` | `r × 2` | 0..=10 |
//!
//! The same signals also yield a composite difficulty multiplier used to size
//! reward pools (see [`difficulty_multiplier`]).

use std::collections::VecDeque;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use boss_core::constants::{DEFAULT_RATING_UPDATE_INTERVAL_MS, MAX_SCORE, RECENT_KILL_WINDOW_MS};
use boss_core::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::progression::player_power_modifier;

/// Score with no adjustments applied.
///
/// A fresh or reset rater reports this score at level `Normal`, even though
/// 50 falls in the `Hard` band; the first real rating replaces both.
pub const BASE_SCORE: u8 = 50;

/// Group size the participant signal is centred on.
const PARTICIPANT_BASE: i64 = 3;

const NEVER: i64 = i64::MIN;

// ------------------------------------------------------------------
// DifficultyLevel
// ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Normal,
    Hard,
    Hell,
    Desperate,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 5] = [
        DifficultyLevel::Easy,
        DifficultyLevel::Normal,
        DifficultyLevel::Hard,
        DifficultyLevel::Hell,
        DifficultyLevel::Desperate,
    ];

    /// Level band containing `score`. Scores above 100 are `Desperate`.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=20 => DifficultyLevel::Easy,
            21..=40 => DifficultyLevel::Normal,
            41..=60 => DifficultyLevel::Hard,
            61..=80 => DifficultyLevel::Hell,
            _ => DifficultyLevel::Desperate,
        }
    }

    pub fn score_range(&self) -> RangeInclusive<u8> {
        match self {
            DifficultyLevel::Easy => 0..=20,
            DifficultyLevel::Normal => 21..=40,
            DifficultyLevel::Hard => 41..=60,
            DifficultyLevel::Hell => 61..=80,
            DifficultyLevel::Desperate => 81..=100,
        }
    }

    /// Typical attribute multiplier span for bosses rated at this level.
    pub fn multiplier_range(&self) -> (f64, f64) {
        match self {
            DifficultyLevel::Easy => (1.0, 1.2),
            DifficultyLevel::Normal => (1.2, 1.5),
            DifficultyLevel::Hard => (1.5, 2.0),
            DifficultyLevel::Hell => (2.0, 3.0),
            DifficultyLevel::Desperate => (3.0, 5.0),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "Easy",
            DifficultyLevel::Normal => "Normal",
            DifficultyLevel::Hard => "Hard",
            DifficultyLevel::Hell => "Hell",
            DifficultyLevel::Desperate => "Desperate",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ------------------------------------------------------------------
// Score adjustments
// ------------------------------------------------------------------

pub fn participant_adjustment(participants: u32) -> i64 {
    ((PARTICIPANT_BASE - i64::from(participants)) * 10).clamp(-30, 30)
}

/// 0 when the recommendation is not positive or the gap is not finite.
pub fn power_adjustment(average_power: f64, recommended_power: f64) -> i64 {
    if recommended_power <= 0.0 {
        return 0;
    }
    let diff = (average_power - recommended_power) / recommended_power;
    if !diff.is_finite() {
        return 0;
    }
    ((diff * 40.0) as i64).clamp(-40, 40)
}

pub fn history_adjustment(total_kills: u32) -> i64 {
    ((f64::from(total_kills) * 0.6).min(30.0) as i64).max(0)
}

pub fn recent_kill_adjustment(recent_kills: u32) -> i64 {
    (i64::from(recent_kills) * 2).clamp(0, 10)
}

/// `clamp(50 + all four adjustments, 0, 100)`.
pub fn difficulty_score(
    participants: u32,
    average_power: f64,
    recommended_power: f64,
    total_kills: u32,
    recent_kills: u32,
) -> u8 {
    let score = i64::from(BASE_SCORE)
        + participant_adjustment(participants)
        + power_adjustment(average_power, recommended_power)
        + history_adjustment(total_kills)
        + recent_kill_adjustment(recent_kills);
    // Clamped into 0..=100, the cast is lossless.
    score.clamp(0, i64::from(MAX_SCORE)) as u8
}

// ------------------------------------------------------------------
// Difficulty multiplier
// ------------------------------------------------------------------

pub fn participant_modifier(participants: u32) -> f64 {
    (1.0 + (PARTICIPANT_BASE - i64::from(participants)) as f64 * 0.1).clamp(0.3, 1.5)
}

pub fn history_modifier(total_kills: u32) -> f64 {
    (1.0 + f64::from(total_kills) * 0.02).min(2.0)
}

pub fn time_modifier(recent_kills: u32) -> f64 {
    (1.0 + f64::from(recent_kills) * 0.05).min(1.2)
}

/// Composite multiplier applied to reward pools.
///
/// History and recent-kill modifiers are damped to half and 30% of their
/// excess over 1.0 respectively. Never returns a non-finite value; 1.0 is
/// used instead.
pub fn difficulty_multiplier(
    participants: u32,
    average_power: f64,
    recommended_power: f64,
    total_kills: u32,
    recent_kills: u32,
) -> f64 {
    let m = participant_modifier(participants)
        * player_power_modifier(average_power, recommended_power)
        * (1.0 + (history_modifier(total_kills) - 1.0) * 0.5)
        * (1.0 + (time_modifier(recent_kills) - 1.0) * 0.3);
    if m.is_finite() { m } else { 1.0 }
}

// ------------------------------------------------------------------
// DifficultyRater
// ------------------------------------------------------------------

#[derive(Debug)]
struct RaterState {
    score: u8,
    level: DifficultyLevel,
    last_update_ms: i64,
    update_interval_ms: i64,
    kill_times: VecDeque<i64>,
}

impl RaterState {
    fn prune(&mut self, now_ms: i64) {
        let window_start = now_ms.saturating_sub(RECENT_KILL_WINDOW_MS);
        self.kill_times.retain(|&ts| ts >= window_start);
    }
}

/// Rolling difficulty score for one boss type, throttled to one
/// recomputation per update interval.
///
/// The recent-kill window spans every encounter of the type, so a rater
/// outlives the individual boss instances it rates.
pub struct DifficultyRater {
    boss_type: String,
    clock: Arc<dyn Clock>,
    state: Mutex<RaterState>,
}

impl DifficultyRater {
    pub fn new(boss_type: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            boss_type: boss_type.into(),
            clock,
            state: Mutex::new(RaterState {
                score: BASE_SCORE,
                level: DifficultyLevel::Normal,
                last_update_ms: NEVER,
                update_interval_ms: DEFAULT_RATING_UPDATE_INTERVAL_MS,
                kill_times: VecDeque::new(),
            }),
        }
    }

    /// Rate the encounter. Within the update interval of the previous
    /// rating, the previous score is returned unchanged.
    pub fn calculate_score(
        &self,
        participants: u32,
        average_power: f64,
        recommended_power: f64,
        total_kills: u32,
        recent_kills: u32,
    ) -> u8 {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if now.saturating_sub(state.last_update_ms) < state.update_interval_ms {
            return state.score;
        }

        let score = difficulty_score(participants, average_power, recommended_power, total_kills, recent_kills);
        state.score = score;
        state.level = DifficultyLevel::from_score(score);
        state.last_update_ms = now;
        debug!(boss_type = %self.boss_type, score, level = %state.level, "rating: difficulty updated");
        score
    }

    /// Composite reward multiplier for the given signals. Stateless.
    ///
    /// Non-finite power figures count as matched players.
    pub fn difficulty_multiplier(
        &self,
        participants: u32,
        average_power: f64,
        recommended_power: f64,
        total_kills: u32,
        recent_kills: u32,
    ) -> f64 {
        if !average_power.is_finite() || !recommended_power.is_finite() {
            warn!(
                boss_type = %self.boss_type,
                average_power,
                recommended_power,
                "rating: non-finite power, using neutral power modifier"
            );
        }
        difficulty_multiplier(participants, average_power, recommended_power, total_kills, recent_kills)
    }

    pub fn score(&self) -> u8 {
        self.state.lock().score
    }

    pub fn level(&self) -> DifficultyLevel {
        self.state.lock().level
    }

    /// Let the next `calculate_score` recompute regardless of the interval.
    pub fn force_update(&self) {
        self.state.lock().last_update_ms = NEVER;
    }

    pub fn set_update_interval_ms(&self, interval_ms: i64) {
        self.state.lock().update_interval_ms = interval_ms;
    }

    pub fn update_interval_ms(&self) -> i64 {
        self.state.lock().update_interval_ms
    }

    /// Remember a kill at `timestamp_ms` and drop kills older than one hour.
    pub fn record_kill(&self, timestamp_ms: i64) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.kill_times.push_back(timestamp_ms);
        state.prune(now);
    }

    /// Kills within the hour before `now_ms`.
    pub fn recent_kill_count(&self, now_ms: i64) -> u32 {
        let mut state = self.state.lock();
        state.prune(now_ms);
        u32::try_from(state.kill_times.len()).unwrap_or(u32::MAX)
    }

    pub fn boss_type(&self) -> &str {
        &self.boss_type
    }

    /// Back to 50 / Normal with an empty kill window.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.score = BASE_SCORE;
        state.level = DifficultyLevel::Normal;
        state.last_update_ms = NEVER;
        state.kill_times.clear();
    }
}

impl fmt::Display for DifficultyRater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(f, "{} ({}/{})", state.level, state.score, MAX_SCORE)
    }
}

impl fmt::Debug for DifficultyRater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifficultyRater")
            .field("boss_type", &self.boss_type)
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boss_core::ManualClock;
    use proptest::prelude::*;

    fn rater() -> (DifficultyRater, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(RECENT_KILL_WINDOW_MS * 2));
        (DifficultyRater::new("Dragon", clock.clone()), clock)
    }

    // ------------------------------------------------------------------
    // Levels
    // ------------------------------------------------------------------

    #[test]
    fn level_bands() {
        assert_eq!(DifficultyLevel::from_score(0), DifficultyLevel::Easy);
        assert_eq!(DifficultyLevel::from_score(20), DifficultyLevel::Easy);
        assert_eq!(DifficultyLevel::from_score(21), DifficultyLevel::Normal);
        assert_eq!(DifficultyLevel::from_score(60), DifficultyLevel::Hard);
        assert_eq!(DifficultyLevel::from_score(61), DifficultyLevel::Hell);
        assert_eq!(DifficultyLevel::from_score(100), DifficultyLevel::Desperate);
        assert_eq!(DifficultyLevel::from_score(255), DifficultyLevel::Desperate);
    }

    #[test]
    fn score_ranges_cover_zero_to_hundred() {
        for score in 0..=MAX_SCORE {
            let level = DifficultyLevel::from_score(score);
            assert!(level.score_range().contains(&score));
        }
        assert_eq!(DifficultyLevel::ALL.len(), 5);
    }

    // ------------------------------------------------------------------
    // Adjustments
    // ------------------------------------------------------------------

    #[test]
    fn participant_adjustment_clamps() {
        assert_eq!(participant_adjustment(0), 30);
        assert_eq!(participant_adjustment(1), 20);
        assert_eq!(participant_adjustment(3), 0);
        assert_eq!(participant_adjustment(5), -20);
        assert_eq!(participant_adjustment(50), -30);
    }

    #[test]
    fn power_adjustment_truncates_and_clamps() {
        assert_eq!(power_adjustment(100.0, 0.0), 0);
        assert_eq!(power_adjustment(f64::NAN, 100.0), 0);
        assert_eq!(power_adjustment(110.0, 100.0), 4);
        assert_eq!(power_adjustment(90.0, 100.0), -4);
        assert_eq!(power_adjustment(1_000.0, 100.0), 40);
        assert_eq!(power_adjustment(0.0, 100.0), -40);
    }

    #[test]
    fn history_and_recent_adjustments() {
        assert_eq!(history_adjustment(0), 0);
        assert_eq!(history_adjustment(10), 6);
        assert_eq!(history_adjustment(100), 30);
        assert_eq!(recent_kill_adjustment(0), 0);
        assert_eq!(recent_kill_adjustment(3), 6);
        assert_eq!(recent_kill_adjustment(u32::MAX), 10);
    }

    #[test]
    fn score_composition() {
        // 50 + 0 + 0 + 0 + 0
        assert_eq!(difficulty_score(3, 100.0, 100.0, 0, 0), 50);
        // 50 + 30 + 40 + 30 + 10 -> clamped
        assert_eq!(difficulty_score(0, 0.0, 100.0, 100, 10), 100);
        // 50 - 30 - 40 -> clamped
        assert_eq!(difficulty_score(20, 1_000.0, 100.0, 0, 0), 0);
        // 50 + 20 + 0 + 6 + 4
        assert_eq!(difficulty_score(1, 100.0, 100.0, 10, 2), 80);
    }

    // ------------------------------------------------------------------
    // Multiplier
    // ------------------------------------------------------------------

    #[test]
    fn modifiers_clamp() {
        assert_eq!(participant_modifier(3), 1.0);
        assert!((participant_modifier(0) - 1.3).abs() < 1e-12);
        assert_eq!(participant_modifier(100), 0.3);
        assert_eq!(history_modifier(100), 2.0);
        assert_eq!(time_modifier(100), 1.2);
    }

    #[test]
    fn multiplier_neutral_at_baseline() {
        assert_eq!(difficulty_multiplier(3, 100.0, 100.0, 0, 0), 1.0);
    }

    #[test]
    fn multiplier_damps_history_and_time() {
        // history 2.0 -> 1.5, time 1.2 -> 1.06
        let m = difficulty_multiplier(3, 100.0, 100.0, 100, 100);
        assert!((m - 1.5 * 1.06).abs() < 1e-9);
    }

    #[test]
    fn multiplier_ignores_non_finite_power() {
        let (r, _) = rater();
        assert_eq!(difficulty_multiplier(3, f64::NAN, 100.0, 0, 0), 1.0);
        assert_eq!(r.difficulty_multiplier(3, 100.0, f64::INFINITY, 0, 0), 1.0);
        // Other signals still apply.
        assert!((r.difficulty_multiplier(2, f64::NAN, 100.0, 0, 0) - 1.1).abs() < 1e-12);
    }

    // ------------------------------------------------------------------
    // Rater state
    // ------------------------------------------------------------------

    #[test]
    fn starts_normal_at_fifty() {
        let (r, _) = rater();
        assert_eq!(r.score(), 50);
        assert_eq!(r.level(), DifficultyLevel::Normal);
        assert_eq!(r.to_string(), "Normal (50/100)");
    }

    #[test]
    fn throttled_by_update_interval() {
        let (r, clock) = rater();
        assert_eq!(r.calculate_score(1, 100.0, 100.0, 0, 0), 70);
        clock.advance(500);
        assert_eq!(r.calculate_score(10, 100.0, 100.0, 0, 0), 70);
        clock.advance(500);
        assert_eq!(r.calculate_score(10, 100.0, 100.0, 0, 0), 20);
        assert_eq!(r.level(), DifficultyLevel::Easy);
    }

    #[test]
    fn force_update_skips_interval() {
        let (r, _) = rater();
        r.calculate_score(1, 100.0, 100.0, 0, 0);
        r.force_update();
        assert_eq!(r.calculate_score(3, 100.0, 100.0, 0, 0), 50);
    }

    #[test]
    fn update_interval_is_adjustable() {
        let (r, _) = rater();
        r.set_update_interval_ms(0);
        assert_eq!(r.update_interval_ms(), 0);
        r.calculate_score(1, 100.0, 100.0, 0, 0);
        assert_eq!(r.calculate_score(3, 100.0, 100.0, 0, 0), 50);
    }

    #[test]
    fn recent_kill_window_slides() {
        let (r, clock) = rater();
        let now = clock.now_ms();
        r.record_kill(now - RECENT_KILL_WINDOW_MS - 1);
        r.record_kill(now - 10_000);
        r.record_kill(now);
        assert_eq!(r.recent_kill_count(now), 2);

        clock.advance(RECENT_KILL_WINDOW_MS);
        assert_eq!(r.recent_kill_count(clock.now_ms()), 1);
    }

    #[test]
    fn reset_clears_window_and_score() {
        let (r, clock) = rater();
        r.record_kill(clock.now_ms());
        r.calculate_score(0, 0.0, 100.0, 100, 10);
        assert_eq!(r.level(), DifficultyLevel::Desperate);

        r.reset();
        assert_eq!(r.score(), 50);
        assert_eq!(r.level(), DifficultyLevel::Normal);
        assert_eq!(r.recent_kill_count(clock.now_ms()), 0);
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn score_bounded(
            n in 0u32..200,
            avg in -1.0e6f64..1.0e6,
            rec in -10.0f64..1.0e6,
            kills in 0u32..10_000,
            recent in 0u32..1_000,
        ) {
            let score = difficulty_score(n, avg, rec, kills, recent);
            prop_assert!(score <= MAX_SCORE);
            prop_assert!(DifficultyLevel::from_score(score).score_range().contains(&score));
        }

        #[test]
        fn multiplier_positive_and_finite(
            n in 0u32..200,
            avg in 0.0f64..1.0e6,
            rec in 1.0f64..1.0e6,
            kills in 0u32..10_000,
            recent in 0u32..1_000,
        ) {
            let m = difficulty_multiplier(n, avg, rec, kills, recent);
            prop_assert!(m.is_finite());
            prop_assert!(m > 0.0);
        }
    }
}
