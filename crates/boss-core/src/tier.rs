//! Boss tiers and their static stat tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TierError;

/// Difficulty class of a boss.
///
/// Each tier carries an immutable stat tuple. The derived
/// [`health_multiplier`](BossTier::health_multiplier) is `level × 10`.
///
/// | Tier      | Level | Cultivation | Health  | Damage | Armor |
/// |-----------|-------|-------------|---------|--------|-------|
/// | Normal    | 1     | 0.5×        | 5,000   | 50     | 10    |
/// | Elite     | 2     | 2.0×        | 15,000  | 80     | 30    |
/// | WorldBoss | 3     | 3.0×        | 50,000  | 120    | 50    |
/// | Legendary | 4     | 5.0×        | 200,000 | 200    | 80    |
///
/// # Examples
///
/// ```
/// use boss_core::BossTier;
///
/// assert_eq!(BossTier::WorldBoss.level(), 3);
/// assert_eq!(BossTier::WorldBoss.health_multiplier(), 30.0);
/// assert_eq!("legendary".parse::<BossTier>().unwrap(), BossTier::Legendary);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BossTier {
    /// Solo or duo content.
    #[default]
    Normal,
    /// Small party (3–5).
    Elite,
    /// Raid group (5–10).
    WorldBoss,
    /// Several raid groups (10+).
    Legendary,
}

impl BossTier {
    /// All tiers, lowest first.
    pub const ALL: [BossTier; 4] = [
        BossTier::Normal,
        BossTier::Elite,
        BossTier::WorldBoss,
        BossTier::Legendary,
    ];

    pub fn level(&self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Elite => 2,
            Self::WorldBoss => 3,
            Self::Legendary => 4,
        }
    }

    /// Tier for a 1-based level, `None` outside `1..=4`.
    pub fn from_level(level: u8) -> Option<BossTier> {
        match level {
            1 => Some(Self::Normal),
            2 => Some(Self::Elite),
            3 => Some(Self::WorldBoss),
            4 => Some(Self::Legendary),
            _ => None,
        }
    }

    /// Like [`from_level`](Self::from_level) but reports the bad level.
    pub fn try_from_level(level: u8) -> Result<BossTier, TierError> {
        Self::from_level(level).ok_or(TierError::LevelOutOfRange(level))
    }

    /// Cultivation reward multiplier relative to an ordinary monster.
    pub fn cultivation_multiplier(&self) -> f64 {
        match self {
            Self::Normal => 0.5,
            Self::Elite => 2.0,
            Self::WorldBoss => 3.0,
            Self::Legendary => 5.0,
        }
    }

    pub fn recommended_health(&self) -> u32 {
        match self {
            Self::Normal => 5_000,
            Self::Elite => 15_000,
            Self::WorldBoss => 50_000,
            Self::Legendary => 200_000,
        }
    }

    pub fn recommended_damage(&self) -> u32 {
        match self {
            Self::Normal => 50,
            Self::Elite => 80,
            Self::WorldBoss => 120,
            Self::Legendary => 200,
        }
    }

    pub fn recommended_armor(&self) -> u32 {
        match self {
            Self::Normal => 10,
            Self::Elite => 30,
            Self::WorldBoss => 50,
            Self::Legendary => 80,
        }
    }

    /// Base tier multiplier fed into attribute progression: `level × 10`.
    pub fn health_multiplier(&self) -> f64 {
        f64::from(self.level()) * 10.0
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal Boss",
            Self::Elite => "Elite Boss",
            Self::WorldBoss => "World Boss",
            Self::Legendary => "Legendary Boss",
        }
    }

    /// Next tier up, saturating at [`Legendary`](Self::Legendary).
    pub fn next(&self) -> BossTier {
        Self::from_level(self.level() + 1).unwrap_or(*self)
    }

    /// Next tier down, saturating at [`Normal`](Self::Normal).
    pub fn previous(&self) -> BossTier {
        Self::from_level(self.level().saturating_sub(1)).unwrap_or(*self)
    }
}

impl fmt::Display for BossTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Lv.{})", self.display_name(), self.level())
    }
}

impl FromStr for BossTier {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "elite" => Ok(Self::Elite),
            "world_boss" | "worldboss" | "boss" => Ok(Self::WorldBoss),
            "legendary" => Ok(Self::Legendary),
            _ => Err(TierError::Unknown(s.to_string())),
        }
    }
}
