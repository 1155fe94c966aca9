//! # boss-engine
//! The boss encounter pipeline: damage ledger, live scaling, difficulty
//! rating, quality scoring and reward allocation behind one entry point.

pub mod config;
pub mod engine;

pub use crate::config::EngineConfig;
pub use engine::{BossEngine, Conclusion, EncounterReport};
