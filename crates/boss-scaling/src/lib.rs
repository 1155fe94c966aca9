//! # boss-scaling: adaptive boss difficulty.
//!
//! - [`DifficultyScaler`]: the six attribute multipliers of a live boss,
//!   derived from tier, historical kill count and the player power gap.
//! - [`DifficultyRater`]: the 0–100 difficulty score and the composite
//!   difficulty multiplier used when sizing reward pools.

pub mod progression;
pub mod rating;

pub use progression::{DifficultyScaler, Refresh, ThreatBand};
pub use rating::{DifficultyLevel, DifficultyRater};
