//! Error types for the boss combat engine.
//!
//! None of these are fatal. Component operations catch them at their own
//! boundary, log them and fall back to the previous or default state; the
//! `Result` returns exist so callers can log with their own context.
use thiserror::Error;

use crate::types::BossId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("unknown boss tier: {0}")] Unknown(String),
    #[error("tier level out of range: {0}")] LevelOutOfRange(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("kill history unavailable: {0}")] Unavailable(String),
    #[error("kill history query for {boss_type} failed: {reason}")] QueryFailed { boss_type: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalingError {
    #[error(transparent)] History(#[from] HistoryError),
    #[error("non-finite input {name}: {value}")] NonFiniteInput { name: &'static str, value: f64 },
    #[error("non-finite {0} multiplier")] NonFiniteMultiplier(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualityError {
    #[error("arithmetic overflow in {0}")] Overflow(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config load: {0}")] Load(String),
    #[error("invalid value for {key}: {reason}")] Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown boss: {0}")] UnknownBoss(BossId),
    #[error(transparent)] Tier(#[from] TierError),
    #[error(transparent)] Scaling(#[from] ScalingError),
    #[error(transparent)] Quality(#[from] QualityError),
    #[error(transparent)] Config(#[from] ConfigError),
}
