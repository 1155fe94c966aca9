//! Encounter quality scoring.
//!
//! Pure integer computation over [`EncounterFacts`]. Scores are 0–100 and map
//! to five grades that scale experience and drops.

use std::fmt;

use boss_core::constants::MAX_SCORE;
use boss_core::{BossId, EncounterFacts, QualityError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const BONUS_NO_DEATHS: i32 = 10;
/// Awarded when the kill took less than [`FAST_KILL_MS`].
pub const BONUS_FAST_KILL: i32 = 5;
/// No deaths in a group of at least [`FULL_SURVIVAL_MIN_PARTICIPANTS`].
pub const BONUS_FULL_SURVIVAL: i32 = 15;
/// No deaths against a boss rated above [`HARD_DIFFICULTY_THRESHOLD`].
pub const BONUS_HARD_FLAWLESS: i32 = 15;

pub const PENALTY_SLOW_KILL: i32 = -10;
pub const PENALTY_PER_DEATH: i32 = -5;
pub const PENALTY_WEAKENED: i32 = -20;
pub const PENALTY_FARM_KILL: i32 = -15;

/// 10 minutes.
pub const FAST_KILL_MS: u64 = 10 * 60 * 1_000;
/// 40 minutes.
pub const SLOW_KILL_MS: u64 = 40 * 60 * 1_000;

pub const FULL_SURVIVAL_MIN_PARTICIPANTS: u32 = 3;
pub const HARD_DIFFICULTY_THRESHOLD: u8 = 70;

/// Score reported when scoring fails or nothing has been scored yet.
pub const DEFAULT_QUALITY_SCORE: u8 = 50;

// ---------------------------------------------------------------------------
// QualityLevel
// ---------------------------------------------------------------------------

/// Encounter grade.
///
/// | Grade | Score | Experience | Drops |
/// |-------|--------|-----------|-------|
/// | S     | 90–100 | 2.0×      | 3.0×  |
/// | A     | 75–89  | 1.5×      | 2.0×  |
/// | B     | 50–74  | 1.0×      | 1.0×  |
/// | C     | 25–49  | 0.8×      | 0.8×  |
/// | D     | 0–24   | 0.5×      | 0.5×  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum QualityLevel {
    D,
    C,
    #[default]
    B,
    A,
    S,
}

impl QualityLevel {
    /// Grade for a score. Scores above 100 grade as S.
    ///
    /// # Examples
    ///
    /// ```
    /// use boss_rewards::QualityLevel;
    ///
    /// assert_eq!(QualityLevel::from_score(100), QualityLevel::S);
    /// assert_eq!(QualityLevel::from_score(89), QualityLevel::A);
    /// assert_eq!(QualityLevel::from_score(50), QualityLevel::B);
    /// assert_eq!(QualityLevel::from_score(24), QualityLevel::D);
    /// ```
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => QualityLevel::S,
            75..=89 => QualityLevel::A,
            50..=74 => QualityLevel::B,
            25..=49 => QualityLevel::C,
            _ => QualityLevel::D,
        }
    }

    pub fn experience_multiplier(&self) -> f64 {
        match self {
            QualityLevel::S => 2.0,
            QualityLevel::A => 1.5,
            QualityLevel::B => 1.0,
            QualityLevel::C => 0.8,
            QualityLevel::D => 0.5,
        }
    }

    pub fn drop_multiplier(&self) -> f64 {
        match self {
            QualityLevel::S => 3.0,
            QualityLevel::A => 2.0,
            QualityLevel::B => 1.0,
            QualityLevel::C => 0.8,
            QualityLevel::D => 0.5,
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grade = match self {
            QualityLevel::S => "S",
            QualityLevel::A => "A",
            QualityLevel::B => "B",
            QualityLevel::C => "C",
            QualityLevel::D => "D",
        };
        f.write_str(grade)
    }
}

// ---------------------------------------------------------------------------
// QualityScore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: u8,
    pub level: QualityLevel,
}

impl QualityScore {
    pub fn new(score: u8) -> Self {
        let score = score.min(MAX_SCORE);
        Self {
            score,
            level: QualityLevel::from_score(score),
        }
    }

    pub fn experience_multiplier(&self) -> f64 {
        self.level.experience_multiplier()
    }

    pub fn drop_multiplier(&self) -> f64 {
        self.level.drop_multiplier()
    }
}

impl Default for QualityScore {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY_SCORE)
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grade {} ({}/{}), exp {:.1}x, drops {:.1}x",
            self.level,
            self.score,
            MAX_SCORE,
            self.experience_multiplier(),
            self.drop_multiplier()
        )
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score an encounter.
///
/// 1. `base = clamp((participants + level × 20 + difficulty × 30) / 3, 0, 100)`
///    with integer division. Difficulty above 100 counts as 100.
/// 2. Bonuses: no deaths +10, under 10 min +5, no deaths with ≥ 3 players +15,
///    no deaths at difficulty > 70 +15.
/// 3. Penalties: over 40 min −10, −5 per death, weakened −20, farm kill −15.
/// 4. Clamp to 0–100.
///
/// Any death count is accepted; enough deaths always floor the score at 0.
/// Fails only when `participant_count` is out of range.
pub fn score_encounter(facts: &EncounterFacts) -> Result<QualityScore, QualityError> {
    let participants =
        i32::try_from(facts.participant_count).map_err(|_| QualityError::Overflow("participant_count"))?;
    let level = i32::from(facts.boss_level);
    let difficulty = i32::from(facts.difficulty_score.min(MAX_SCORE));
    let no_deaths = facts.death_count == 0;

    let raw = participants
        .checked_add(level * 20)
        .and_then(|v| v.checked_add(difficulty * 30))
        .ok_or(QualityError::Overflow("base score"))?;
    let mut score = (raw / 3).clamp(0, i32::from(MAX_SCORE));

    if no_deaths {
        score += BONUS_NO_DEATHS;
    }
    if facts.duration_ms < FAST_KILL_MS {
        score += BONUS_FAST_KILL;
    }
    if no_deaths && facts.participant_count >= FULL_SURVIVAL_MIN_PARTICIPANTS {
        score += BONUS_FULL_SURVIVAL;
    }
    if no_deaths && facts.difficulty_score > HARD_DIFFICULTY_THRESHOLD {
        score += BONUS_HARD_FLAWLESS;
    }

    if facts.duration_ms > SLOW_KILL_MS {
        score += PENALTY_SLOW_KILL;
    }
    // Penalties run in i64: any u32 death count times the per-death penalty fits.
    let mut total = i64::from(score) + i64::from(facts.death_count) * i64::from(PENALTY_PER_DEATH);
    if facts.boss_was_weakened {
        total += i64::from(PENALTY_WEAKENED);
    }
    if facts.was_farm_kill {
        total += i64::from(PENALTY_FARM_KILL);
    }

    // Clamped into 0..=100, the cast is lossless.
    Ok(QualityScore::new(total.clamp(0, i64::from(MAX_SCORE)) as u8))
}

// ---------------------------------------------------------------------------
// QualityScorer
// ---------------------------------------------------------------------------

/// Scores encounters for one boss and remembers the latest grade.
#[derive(Debug)]
pub struct QualityScorer {
    boss_id: BossId,
    last: Mutex<QualityScore>,
}

impl QualityScorer {
    pub fn new(boss_id: BossId) -> Self {
        Self {
            boss_id,
            last: Mutex::new(QualityScore::default()),
        }
    }

    /// Score `facts` and store the result.
    ///
    /// Never fails: an overflow logs a warning and yields 50 / B.
    pub fn calculate_quality(&self, facts: &EncounterFacts) -> QualityScore {
        let result = match score_encounter(facts) {
            Ok(score) => {
                debug!(boss = %self.boss_id, score = score.score, grade = %score.level, "quality: encounter scored");
                score
            }
            Err(e) => {
                warn!(boss = %self.boss_id, error = %e, "quality: scoring failed, using default grade");
                QualityScore::default()
            }
        };
        *self.last.lock() = result;
        result
    }

    pub fn last_score(&self) -> QualityScore {
        *self.last.lock()
    }

    pub fn quality_level(&self) -> QualityLevel {
        self.last.lock().level
    }

    pub fn experience_multiplier(&self) -> f64 {
        self.last.lock().experience_multiplier()
    }

    pub fn drop_multiplier(&self) -> f64 {
        self.last.lock().drop_multiplier()
    }

    /// Back to 50 / B.
    pub fn reset(&self) {
        *self.last.lock() = QualityScore::default();
    }
}

impl fmt::Display for QualityScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.last_score(), f)
    }
}
