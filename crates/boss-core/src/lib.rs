//! # boss-core
//! Foundation types and traits for the boss combat engine.

pub mod constants;
pub mod error;
pub mod tier;
pub mod traits;
pub mod types;

pub use error::{
    ConfigError, EngineError, HistoryError, QualityError, ScalingError, TierError,
};
pub use tier::BossTier;
pub use traits::{Clock, KillHistory, ManualClock, SystemClock};
pub use types::{AttributeMultipliers, BossId, DamageEvent, EncounterFacts, ParticipantId};
