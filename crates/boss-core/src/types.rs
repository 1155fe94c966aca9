//! Core value types: identifiers, damage events, encounter facts, multipliers.
//!
//! Timestamps are Unix milliseconds (`i64`), damage amounts are `f64`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// The nil id. Treated as "absent" wherever an id is optional.
            pub const NIL: Self = Self(Uuid::nil());

            /// A fresh random (v4) id.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id! {
    /// Identifier of a combat participant (a player).
    ParticipantId
}

uuid_id! {
    /// Identifier of one boss instance, i.e. one encounter.
    BossId
}

/// A single hit on a boss, as delivered by the combat-event source.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DamageEvent {
    pub boss_id: BossId,
    pub participant_id: ParticipantId,
    /// Damage dealt. Zero, negative and non-finite amounts are ignored.
    pub amount: f64,
    pub timestamp_ms: i64,
}

/// Outcome facts of a completed encounter, consumed by quality scoring.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EncounterFacts {
    pub participant_count: u32,
    /// Tier level, 1–4.
    pub boss_level: u8,
    /// Difficulty score, 0–100. Larger values are treated as 100.
    pub difficulty_score: u8,
    pub duration_ms: u64,
    pub death_count: u32,
    /// The boss was weakened after running past its time limit.
    pub boss_was_weakened: bool,
    /// The kill belongs to a rapid repeat-kill ("farm") streak.
    pub was_farm_kill: bool,
}

/// The six attribute multipliers applied to a live boss.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AttributeMultipliers {
    pub health: f64,
    pub damage: f64,
    pub speed: f64,
    pub armor: f64,
    pub attack_range: f64,
    pub drop: f64,
}

impl AttributeMultipliers {
    /// All multipliers at 1.0 (unmodified stats).
    pub const UNIT: Self = Self {
        health: 1.0,
        damage: 1.0,
        speed: 1.0,
        armor: 1.0,
        attack_range: 1.0,
        drop: 1.0,
    };

    /// Name of the first non-finite multiplier, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("health", self.health),
            ("damage", self.damage),
            ("speed", self.speed),
            ("armor", self.armor),
            ("attack_range", self.attack_range),
            ("drop", self.drop),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

impl Default for AttributeMultipliers {
    fn default() -> Self {
        Self::UNIT
    }
}

impl fmt::Display for AttributeMultipliers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "health {:.2}x, damage {:.2}x, speed {:.2}x, armor {:.2}x, range {:.2}x, drops {:.2}x",
            self.health, self.damage, self.speed, self.armor, self.attack_range, self.drop
        )
    }
}
